// src/core/scanner.rs

// The scan pipeline: probe the domain, parse the report, read the
// certificate, enrich the ciphers, assemble the record.
pub mod cert_extractor;
pub mod enricher;
pub mod report_parser;
pub mod scratch;
pub mod tools;

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::models::{CertificateSummary, ParsedReport, PublicKeyInfo, ScanOutcome, ScanRecord};
use self::cert_extractor::CertificateExtractor;
use self::enricher::enrich;
use self::report_parser::{parse, ReportError};
use self::scratch::ScratchArtifacts;
use self::tools::{CertificateSource, ProbeTool};

/// Drives the external tools for one domain and builds its `ScanRecord`.
///
/// A `Scanner` holds no per-domain state and can be shared by every worker
/// of a process.
pub struct Scanner {
    probe: Arc<dyn ProbeTool>,
    certificates: Arc<dyn CertificateSource>,
    extractor: Arc<dyn CertificateExtractor>,
    scratch_dir: PathBuf,
    source: String,
}

impl Scanner {
    pub fn new(
        probe: Arc<dyn ProbeTool>,
        certificates: Arc<dyn CertificateSource>,
        extractor: Arc<dyn CertificateExtractor>,
        scratch_dir: impl Into<PathBuf>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            certificates,
            extractor,
            scratch_dir: scratch_dir.into(),
            source: source.into(),
        }
    }

    /// Runs a complete scan of `domain`.
    ///
    /// Any stderr output from the probe, or a probe that cannot run, is a
    /// `ToolFailure`; a report that does not match the expected schema is a
    /// `ParseFailure`. Certificate retrieval problems only degrade the public
    /// key fields. The report and certificate artifacts are removed before
    /// this returns, on every path.
    pub async fn run_scan(&self, domain: &str) -> ScanOutcome {
        let artifacts = match ScratchArtifacts::for_domain(&self.scratch_dir, domain) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(domain, error = %e, "Cannot place scratch files.");
                return ScanOutcome::ToolFailure(format!("scratch directory unusable: {e}"));
            }
        };

        info!(domain, "Starting probe.");
        match self.probe.probe(domain, &artifacts.report).await {
            Ok(output) if output.stderr.is_empty() => {}
            Ok(output) => {
                warn!(domain, stderr = %output.stderr, "Probe reported errors.");
                return ScanOutcome::ToolFailure(output.stderr);
            }
            Err(e) => {
                warn!(domain, error = %e, "Probe could not run.");
                return ScanOutcome::ToolFailure(e.to_string());
            }
        }

        let report = match read_report(&artifacts.report).await {
            Ok(report) => report,
            Err(e) => {
                warn!(domain, error = %e, "Probe report could not be parsed.");
                return ScanOutcome::ParseFailure(e);
            }
        };

        let key = self.public_key(domain, &artifacts.certificate).await;
        info!(
            domain,
            algorithm = %key.algorithm,
            bits = ?key.bit_length,
            ciphers = report.ciphers.len(),
            accepted = report.ciphers.iter().filter(|c| c.status.is_accepted()).count(),
            "Probe finished."
        );

        let ciphers = enrich(&report.ciphers, key.bit_length);
        ScanOutcome::Success(ScanRecord {
            source: self.source.clone(),
            scanned_at: Utc::now(),
            domain: domain.to_string(),
            ciphers,
            certificate: CertificateSummary::merge(report.certificate, key),
        })
    }

    async fn public_key(&self, domain: &str, pem_path: &Path) -> PublicKeyInfo {
        match self.certificates.retrieve(domain, pem_path).await {
            Ok(certificate) => self.extractor.extract(&certificate),
            Err(e) => {
                warn!(domain, error = %e, "Certificate retrieval failed; public key left empty.");
                PublicKeyInfo::absent()
            }
        }
    }
}

async fn read_report(path: &Path) -> Result<ParsedReport, ReportError> {
    let raw = tokio::fs::read_to_string(path).await?;
    debug!(path = %path.display(), bytes = raw.len(), "Read probe report.");
    parse(&raw)
}
