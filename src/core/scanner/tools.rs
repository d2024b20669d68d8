// src/core/scanner/tools.rs

//! The external programs the scanner drives: the `sslscan` probe and the
//! `openssl` certificate chain. Both sit behind small async traits so the
//! pipeline can run against stand-ins.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Port the certificate is fetched from.
pub const TLS_PORT: u16 = 443;

/// Tool invocations in one scan: the probe plus the three `openssl` steps.
pub const TOOL_RUNS_PER_SCAN: u32 = 4;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What the probe printed on standard error. Empty means success.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutput {
    pub stderr: String,
}

/// The leaf certificate of a domain, as PEM and as a readable dump.
#[derive(Debug, Clone, Default)]
pub struct RetrievedCertificate {
    pub pem: Vec<u8>,
    pub dump: String,
}

/// Runs the TLS probe for a domain, writing its XML report to `report_path`.
#[async_trait]
pub trait ProbeTool: Send + Sync {
    async fn probe(&self, domain: &str, report_path: &Path) -> Result<ProbeOutput, ToolError>;
}

/// Fetches a domain's certificate into `pem_path` and renders it as text.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    async fn retrieve(&self, domain: &str, pem_path: &Path) -> Result<RetrievedCertificate, ToolError>;
}

// --- sslscan ---

#[derive(Debug, Clone)]
pub struct SslScan {
    program: PathBuf,
    timeout: Duration,
}

impl SslScan {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }
}

#[async_trait]
impl ProbeTool for SslScan {
    async fn probe(&self, domain: &str, report_path: &Path) -> Result<ProbeOutput, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--no-heartbleed")
            .arg(format!("--xml={}", report_path.display()))
            .arg(domain)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(domain, program = %self.program.display(), "Running probe.");
        let output = run(&mut cmd, &self.program, self.timeout).await?;
        Ok(ProbeOutput {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

// --- openssl ---

#[derive(Debug, Clone)]
pub struct OpenSsl {
    program: PathBuf,
    timeout: Duration,
}

impl OpenSsl {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    async fn fetch_chain(&self, domain: &str) -> Result<Vec<u8>, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("s_client")
            .arg("-connect")
            .arg(format!("{domain}:{TLS_PORT}"))
            .arg("-servername")
            .arg(domain)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let output = run(&mut cmd, &self.program, self.timeout).await?;
        Ok(output.stdout)
    }

    /// Pipes the `s_client` transcript through `x509` to keep only the leaf as PEM.
    async fn write_pem(&self, transcript: &[u8], pem_path: &Path) -> Result<(), ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("x509")
            .arg("-outform")
            .arg("PEM")
            .arg("-out")
            .arg(pem_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = run_with_input(&mut cmd, transcript, &self.program, self.timeout).await?;
        ensure_success(&self.program, output).map(|_| ())
    }

    async fn dump(&self, pem_path: &Path) -> Result<String, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("x509")
            .arg("-text")
            .arg("-noout")
            .arg("-in")
            .arg(pem_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = run(&mut cmd, &self.program, self.timeout).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl CertificateSource for OpenSsl {
    async fn retrieve(&self, domain: &str, pem_path: &Path) -> Result<RetrievedCertificate, ToolError> {
        debug!(domain, "Retrieving certificate.");
        let transcript = self.fetch_chain(domain).await?;
        self.write_pem(&transcript, pem_path).await?;
        let dump = self.dump(pem_path).await?;
        let pem = tokio::fs::read(pem_path).await?;
        Ok(RetrievedCertificate { pem, dump })
    }
}

// --- helpers ---

async fn run(cmd: &mut Command, program: &Path, timeout: Duration) -> Result<Output, ToolError> {
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ToolError::Timeout {
            program: program.display().to_string(),
            timeout,
        })?
        .map_err(|source| spawn_error(program, source))?;
    Ok(output)
}

/// Like `run`, but feeds `input` on stdin. Writing and waiting share one
/// deadline, so a child that stops reading cannot stall the caller.
async fn run_with_input(
    cmd: &mut Command,
    input: &[u8],
    program: &Path,
    timeout: Duration,
) -> Result<Output, ToolError> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|source| spawn_error(program, source))?;

    let exchange = async move {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).await?;
        }
        child.wait_with_output().await
    };

    let output = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| ToolError::Timeout {
            program: program.display().to_string(),
            timeout,
        })??;
    Ok(output)
}

fn spawn_error(program: &Path, source: std::io::Error) -> ToolError {
    ToolError::Spawn {
        program: program.display().to_string(),
        source,
    }
}

fn ensure_success(program: &Path, output: Output) -> Result<Output, ToolError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(ToolError::Failed {
            program: program.display().to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let probe = SslScan::new("/nonexistent/sslscan", Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        let err = probe.probe("example.com", &dir.path().join("x.xml")).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn stderr_is_captured() {
        let probe = SslScan::new("sh", Duration::from_secs(5));
        // `sh --no-heartbleed ...` is rejected by the shell with a message on stderr.
        let dir = tempfile::tempdir().unwrap();
        let out = probe.probe("example.com", &dir.path().join("x.xml")).await.unwrap();
        assert!(!out.stderr.is_empty());
    }

    #[tokio::test]
    async fn stalled_reader_times_out() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("sleep 30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        // Far more than a pipe buffer, so the write blocks until the deadline.
        let input = vec![b'A'; 4 * 1024 * 1024];

        let started = std::time::Instant::now();
        let err = run_with_input(&mut cmd, &input, Path::new("sh"), Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn input_reaches_the_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("cat").stdout(Stdio::piped()).stderr(Stdio::null());

        let output = run_with_input(&mut cmd, b"-----BEGIN CERTIFICATE-----", Path::new("sh"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.stdout, b"-----BEGIN CERTIFICATE-----");
    }

    #[tokio::test]
    async fn certificate_chain_surfaces_tool_errors() {
        let source = OpenSsl::new("/nonexistent/openssl", Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        let err = source.retrieve("example.com", &dir.path().join("x.pem")).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
