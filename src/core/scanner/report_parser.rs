// src/core/scanner/report_parser.rs

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::core::models::{CipherStatus, ParsedReport, RawCipherEntry, ReportedCertificate};

/// Why a probe report could not be turned into a `ParsedReport`.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not read report: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed report: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("report is missing the `{0}` section")]
    MissingSection(&'static str),
    #[error("invalid value {value:?} for `{field}`")]
    InvalidValue { field: &'static str, value: String },
}

// --- XML shape of an sslscan report ---
// Only what the pipeline consumes is declared; every other element is ignored.

#[derive(Debug, Deserialize)]
struct DocumentXml {
    #[serde(default)]
    ssltest: Vec<SslTestXml>,
}

#[derive(Debug, Deserialize)]
struct SslTestXml {
    #[serde(default)]
    cipher: Vec<CipherXml>,
    // sslscan 1.x puts the certificate directly under <ssltest>.
    #[serde(default)]
    certificate: Vec<CertificateXml>,
    // sslscan 2.x wraps it in <certificates>.
    #[serde(default)]
    certificates: Option<CertificatesXml>,
}

#[derive(Debug, Deserialize)]
struct CertificatesXml {
    #[serde(default)]
    certificate: Vec<CertificateXml>,
}

#[derive(Debug, Deserialize)]
struct CipherXml {
    #[serde(rename = "@status")]
    status: Option<String>,
    #[serde(rename = "@sslversion")]
    sslversion: Option<String>,
    #[serde(rename = "@bits")]
    bits: Option<String>,
    #[serde(rename = "@cipher")]
    cipher: Option<String>,
    #[serde(rename = "@ecdhebits")]
    ecdhebits: Option<String>,
    #[serde(rename = "@dhebits")]
    dhebits: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CertificateXml {
    // sslscan 2.x tags the summary "short"; a "full" entry only carries the blob.
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "signature-algorithm")]
    signature_algorithm: Option<String>,
    subject: Option<String>,
    altnames: Option<String>,
    issuer: Option<String>,
    #[serde(rename = "not-valid-before")]
    not_valid_before: Option<String>,
    #[serde(rename = "not-valid-after")]
    not_valid_after: Option<String>,
    expired: Option<String>,
}

/// Parses the XML report written by the probe tool.
///
/// The first `<ssltest>` is used. The certificate section and its subject,
/// issuer, validity window, expiry flag and signature algorithm are
/// mandatory; alternate names are optional and a test with zero cipher
/// lines is accepted.
pub fn parse(raw: &str) -> Result<ParsedReport, ReportError> {
    let document: DocumentXml = quick_xml::de::from_str(raw)?;
    let ssltest = document
        .ssltest
        .into_iter()
        .next()
        .ok_or(ReportError::MissingSection("ssltest"))?;

    let certificate_xml = ssltest
        .certificate
        .into_iter()
        .chain(ssltest.certificates.into_iter().flat_map(|c| c.certificate))
        .find(|c| c.kind.as_deref() != Some("full"))
        .ok_or(ReportError::MissingSection("certificate"))?;
    let certificate = convert_certificate(certificate_xml)?;

    let ciphers = ssltest
        .cipher
        .into_iter()
        .map(convert_cipher)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(ciphers = ciphers.len(), subject = %certificate.subject, "Parsed probe report.");
    Ok(ParsedReport { certificate, ciphers })
}

fn convert_certificate(xml: CertificateXml) -> Result<ReportedCertificate, ReportError> {
    let expired_raw = required(xml.expired, "expired")?;
    let expired = parse_flag(&expired_raw).ok_or(ReportError::InvalidValue {
        field: "expired",
        value: expired_raw,
    })?;

    let alt_names = xml
        .altnames
        .map(|names| {
            names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .filter(|names| !names.is_empty());

    Ok(ReportedCertificate {
        subject: required(xml.subject, "subject")?,
        issuer: required(xml.issuer, "issuer")?,
        not_valid_before: required(xml.not_valid_before, "not-valid-before")?,
        not_valid_after: required(xml.not_valid_after, "not-valid-after")?,
        expired,
        signature_algorithm: required(xml.signature_algorithm, "signature-algorithm")?,
        alt_names,
    })
}

fn convert_cipher(xml: CipherXml) -> Result<RawCipherEntry, ReportError> {
    let status_raw = required(xml.status, "cipher@status")?;
    let status = status_raw
        .parse::<CipherStatus>()
        .map_err(|_| ReportError::InvalidValue { field: "cipher@status", value: status_raw })?;

    Ok(RawCipherEntry {
        status,
        cipher: required(xml.cipher, "cipher@cipher")?,
        protocol: required(xml.sslversion, "cipher@sslversion")?,
        bits: parse_bits(required(xml.bits, "cipher@bits")?, "cipher@bits")?,
        ecdhe_bits: xml.ecdhebits.map(|b| parse_bits(b, "cipher@ecdhebits")).transpose()?,
        dhe_bits: xml.dhebits.map(|b| parse_bits(b, "cipher@dhebits")).transpose()?,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ReportError> {
    value
        .map(|v| v.trim().to_string())
        .ok_or(ReportError::MissingSection(field))
}

fn parse_bits(value: String, field: &'static str) -> Result<u32, ReportError> {
    value
        .trim()
        .parse()
        .map_err(|_| ReportError::InvalidValue { field, value })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
