// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::scanner::report_parser::ReportError;

// --- Backlog Models ---

/// A host name waiting in the shared backlog, together with its lease state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub in_progress: bool,
    pub last_scan_at: Option<DateTime<Utc>>,
}

impl Domain {
    /// A freshly seeded domain: not leased and never scanned.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_progress: false,
            last_scan_at: None,
        }
    }
}

// --- Cipher Models ---

/// How the server answered a single cipher-suite probe.
///
/// `Preferred` is what sslscan reports for the suite the server picks first
/// for a protocol; it is an accepted suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CipherStatus {
    Accepted,
    Preferred,
    Rejected,
}

impl CipherStatus {
    pub fn is_accepted(self) -> bool {
        matches!(self, CipherStatus::Accepted | CipherStatus::Preferred)
    }
}

/// One `<cipher>` line of the probe report, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCipherEntry {
    pub status: CipherStatus,
    pub cipher: String,
    pub protocol: String,
    pub bits: u32,
    pub ecdhe_bits: Option<u32>,
    pub dhe_bits: Option<u32>,
}

/// A cipher suite as persisted in a scan record.
///
/// The key-exchange, authentication, encryption, MAC and export fields are
/// only present when the suite is known to the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherRecord {
    pub status: CipherStatus,
    pub cipher: String,
    pub protocol: String,
    pub bits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kx_strength: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub au: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<bool>,
}

// --- Certificate Models ---

/// Certificate facts as reported by the probe tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedCertificate {
    pub subject: String,
    pub issuer: String,
    pub not_valid_before: String,
    pub not_valid_after: String,
    pub expired: bool,
    pub signature_algorithm: String,
    pub alt_names: Option<Vec<String>>,
}

/// Public key facts taken from the certificate itself.
///
/// `bit_length` is `None` whenever extraction could not find a positive key size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub algorithm: String,
    pub bit_length: Option<u32>,
}

impl PublicKeyInfo {
    /// The degraded value used when the certificate cannot be read.
    pub fn absent() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub not_valid_before: String,
    pub not_valid_after: String,
    pub expired: bool,
    pub signature_algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_names: Option<Vec<String>>,
    pub public_key_algorithm: String,
    pub public_key_length: Option<u32>,
}

impl CertificateSummary {
    /// Joins the two independent certificate sources into one summary.
    pub fn merge(reported: ReportedCertificate, key: PublicKeyInfo) -> Self {
        Self {
            subject: reported.subject,
            issuer: reported.issuer,
            not_valid_before: reported.not_valid_before,
            not_valid_after: reported.not_valid_after,
            expired: reported.expired,
            signature_algorithm: reported.signature_algorithm,
            alt_names: reported.alt_names,
            public_key_algorithm: key.algorithm,
            public_key_length: key.bit_length,
        }
    }
}

// --- Report Models ---

/// The probe report after parsing, ready for enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    pub certificate: ReportedCertificate,
    pub ciphers: Vec<RawCipherEntry>,
}

/// The persisted result of one successful scan cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub source: String,
    pub scanned_at: DateTime<Utc>,
    pub domain: String,
    pub ciphers: Vec<CipherRecord>,
    pub certificate: CertificateSummary,
}

/// What a single scan attempt produced.
#[derive(Debug)]
pub enum ScanOutcome {
    Success(ScanRecord),
    /// The probe tool wrote to stderr, could not be spawned, or timed out.
    ToolFailure(String),
    ParseFailure(ReportError),
}
