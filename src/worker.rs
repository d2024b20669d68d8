// src/worker.rs

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::models::ScanOutcome;
use crate::core::scanner::Scanner;
use crate::lease::LeaseManager;
use crate::store::{ScanRepository, StoreError};

/// How one pass through the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// No idle domain was available.
    Empty,
    Persisted { domain: String, ciphers: usize },
    /// The scan succeeded but its record could not be stored.
    PersistFailed { domain: String },
    ToolFailure { domain: String },
    ParseFailure { domain: String },
    /// The scan step panicked; the lease was still released.
    Aborted { domain: String },
}

/// What a worker does when the backlog has nothing eligible.
#[derive(Debug, Clone, Copy)]
pub struct IdlePolicy {
    pub poll_interval: Duration,
    pub exit_when_empty: bool,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            exit_when_empty: false,
        }
    }
}

/// One sequential claim → scan → persist → release pipeline.
pub struct Worker {
    id: usize,
    leases: LeaseManager,
    scanner: Arc<Scanner>,
    scans: Arc<dyn ScanRepository>,
    idle: IdlePolicy,
}

impl Worker {
    pub fn new(
        id: usize,
        leases: LeaseManager,
        scanner: Arc<Scanner>,
        scans: Arc<dyn ScanRepository>,
        idle: IdlePolicy,
    ) -> Self {
        Self { id, leases, scanner, scans, idle }
    }

    /// Runs cycles until the backlog is empty (if so configured), `shutdown`
    /// flips to `true`, or the store becomes unreachable.
    ///
    /// Only a store error from claiming or releasing ends the loop with `Err`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StoreError> {
        let span = info_span!("worker", id = self.id);
        async move {
            info!("Worker started.");
            loop {
                if *shutdown.borrow() {
                    info!("Shutdown requested; worker stopping.");
                    return Ok(());
                }

                if self.run_cycle().await? != CycleReport::Empty {
                    continue;
                }

                if self.idle.exit_when_empty {
                    info!("Backlog empty; worker exiting.");
                    return Ok(());
                }
                debug!(poll = ?self.idle.poll_interval, "Backlog empty; waiting.");
                tokio::select! {
                    _ = tokio::time::sleep(self.idle.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            info!("Shutdown handle dropped; worker stopping.");
                            return Ok(());
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Processes at most one domain.
    ///
    /// Once a domain is claimed it is released on every path out of this
    /// function except a failed claim itself.
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let Some(lease) = self.leases.claim().await? else {
            return Ok(CycleReport::Empty);
        };
        let domain = lease.name().to_string();

        let outcome = AssertUnwindSafe(self.scanner.run_scan(&domain)).catch_unwind().await;

        let (report, success) = match outcome {
            Ok(ScanOutcome::Success(record)) => match self.scans.insert_scan(&record).await {
                Ok(()) => {
                    info!(domain = %domain, ciphers = record.ciphers.len(), "Scan persisted.");
                    let ciphers = record.ciphers.len();
                    (CycleReport::Persisted { domain: domain.clone(), ciphers }, true)
                }
                Err(e) => {
                    error!(domain = %domain, error = %e, "Failed to persist scan; releasing anyway.");
                    (CycleReport::PersistFailed { domain: domain.clone() }, false)
                }
            },
            Ok(ScanOutcome::ToolFailure(stderr)) => {
                warn!(domain = %domain, stderr = %stderr, "Scan skipped: probe failed.");
                (CycleReport::ToolFailure { domain: domain.clone() }, false)
            }
            Ok(ScanOutcome::ParseFailure(e)) => {
                warn!(domain = %domain, error = %e, "Scan skipped: report unreadable.");
                (CycleReport::ParseFailure { domain: domain.clone() }, false)
            }
            Err(_) => {
                error!(domain = %domain, "Scan panicked; releasing domain.");
                (CycleReport::Aborted { domain: domain.clone() }, false)
            }
        };

        self.leases.release(lease, success).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::cert_extractor::TextDumpExtractor;
    use crate::core::scanner::tools::{
        CertificateSource, ProbeOutput, ProbeTool, RetrievedCertificate, ToolError,
    };
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::path::Path;

    struct Panics;

    #[async_trait]
    impl ProbeTool for Panics {
        async fn probe(&self, _domain: &str, _report_path: &Path) -> Result<ProbeOutput, ToolError> {
            panic!("probe blew up");
        }
    }

    struct Unused;

    #[async_trait]
    impl CertificateSource for Unused {
        async fn retrieve(&self, _domain: &str, _pem_path: &Path) -> Result<RetrievedCertificate, ToolError> {
            Ok(RetrievedCertificate::default())
        }
    }

    fn worker(store: Arc<MemoryStore>, scratch: &Path, idle: IdlePolicy) -> Worker {
        let scanner = Scanner::new(
            Arc::new(Panics),
            Arc::new(Unused),
            Arc::new(TextDumpExtractor),
            scratch,
            "test",
        );
        Worker::new(0, LeaseManager::new(store.clone()), Arc::new(scanner), store, idle)
    }

    #[tokio::test]
    async fn panicking_scan_still_releases() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_domains(["boom.example"]));
        let report = worker(store.clone(), dir.path(), IdlePolicy::default())
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(report, CycleReport::Aborted { domain: "boom.example".into() });
        let domain = store.domain("boom.example").unwrap();
        assert!(!domain.in_progress);
        assert!(domain.last_scan_at.is_some());
    }

    #[tokio::test]
    async fn empty_backlog_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let report = worker(store, dir.path(), IdlePolicy::default()).run_cycle().await.unwrap();
        assert_eq!(report, CycleReport::Empty);
    }

    #[tokio::test]
    async fn unreachable_store_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_domains(["a.example"]));
        store.set_unavailable(true);
        let (_tx, rx) = watch::channel(false);

        let result = worker(store, dir.path(), IdlePolicy::default()).run(rx).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn shutdown_interrupts_idle_wait() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let idle = IdlePolicy { poll_interval: Duration::from_secs(3600), exit_when_empty: false };
        let worker = worker(store, dir.path(), idle);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { worker.run(rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
