// src/core/scanner/scratch.rs

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// The per-domain files a scan writes under the scratch directory.
///
/// Both paths are deleted when this value is dropped, whether or not the
/// tools ever created them.
#[derive(Debug)]
pub struct ScratchArtifacts {
    pub report: TempPath,
    pub certificate: TempPath,
}

impl ScratchArtifacts {
    pub fn for_domain(scratch_dir: &Path, domain: &str) -> io::Result<Self> {
        Ok(Self {
            report: TempPath::try_from_path(artifact_path(scratch_dir, domain, "xml"))?,
            certificate: TempPath::try_from_path(artifact_path(scratch_dir, domain, "pem"))?,
        })
    }
}

/// `<scratch_dir>/<domain>.<ext>`, with anything outside `[A-Za-z0-9.-_]`
/// replaced so a hostile name cannot escape the directory.
pub fn artifact_path(scratch_dir: &Path, domain: &str, ext: &str) -> PathBuf {
    let stem: String = domain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let stem = stem.trim_start_matches('.');
    scratch_dir.join(format!("{stem}.{ext}"))
}
