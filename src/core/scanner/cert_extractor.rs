// src/core/scanner/cert_extractor.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

use crate::core::models::PublicKeyInfo;
use crate::core::scanner::tools::RetrievedCertificate;

const ALGORITHM_MARKER: &str = "Public Key Algorithm:";

static RE_KEY_BITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+) bit\)").unwrap());

/// Reads public-key facts out of a retrieved certificate.
///
/// Extraction is best-effort: an implementation returns
/// `PublicKeyInfo::absent()` instead of failing when the certificate cannot
/// be read.
pub trait CertificateExtractor: Send + Sync {
    fn extract(&self, certificate: &RetrievedCertificate) -> PublicKeyInfo;
}

/// Scans the human-readable `openssl x509 -text` dump.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextDumpExtractor;

impl CertificateExtractor for TextDumpExtractor {
    fn extract(&self, certificate: &RetrievedCertificate) -> PublicKeyInfo {
        extract(&certificate.dump)
    }
}

/// Decodes the PEM artifact with `x509-parser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct X509Extractor;

impl CertificateExtractor for X509Extractor {
    fn extract(&self, certificate: &RetrievedCertificate) -> PublicKeyInfo {
        extract_from_pem(&certificate.pem)
    }
}

/// Extracts the public-key algorithm and bit length from a certificate dump.
///
/// The algorithm is whatever follows `Public Key Algorithm:` on its line; the
/// bit length is the `N` of a `(N bit)` on the line right after it. If
/// either is missing, or `N` is not a positive integer, both come back empty.
pub fn extract(dump: &str) -> PublicKeyInfo {
    let mut lines = dump.lines();

    let Some(algorithm) = lines
        .by_ref()
        .find_map(|line| line.split_once(ALGORITHM_MARKER).map(|(_, rest)| rest.trim()))
    else {
        debug!("No public key algorithm marker in certificate dump.");
        return PublicKeyInfo::absent();
    };

    let bit_length = lines
        .next()
        .and_then(|line| RE_KEY_BITS.captures(line))
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|bits| *bits > 0);

    match bit_length {
        Some(bits) if !algorithm.is_empty() => PublicKeyInfo {
            algorithm: algorithm.to_string(),
            bit_length: Some(bits),
        },
        _ => {
            debug!(algorithm, "No key size line after the public key algorithm.");
            PublicKeyInfo::absent()
        }
    }
}

fn extract_from_pem(pem: &[u8]) -> PublicKeyInfo {
    let parsed = match parse_x509_pem(pem) {
        Ok((_, parsed)) => parsed,
        Err(e) => {
            warn!(error = %e, "Certificate artifact is not valid PEM.");
            return PublicKeyInfo::absent();
        }
    };
    let certificate = match parsed.parse_x509() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to parse X.509 certificate.");
            return PublicKeyInfo::absent();
        }
    };

    let (algorithm, bits) = match certificate.public_key().parsed() {
        Ok(PublicKey::RSA(rsa)) => ("rsaEncryption", rsa.key_size()),
        Ok(PublicKey::EC(point)) => ("id-ecPublicKey", point.key_size()),
        Ok(_) | Err(_) => return PublicKeyInfo::absent(),
    };

    match u32::try_from(bits) {
        Ok(bits) if bits > 0 => PublicKeyInfo {
            algorithm: algorithm.to_string(),
            bit_length: Some(bits),
        },
        _ => PublicKeyInfo::absent(),
    }
}
