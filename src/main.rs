// src/main.rs

use color_eyre::eyre::{Result, WrapErr, eyre};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use tls_census::config::{KeyExtractorKind, Settings};
use tls_census::core::scanner::Scanner;
use tls_census::core::scanner::cert_extractor::{CertificateExtractor, TextDumpExtractor, X509Extractor};
use tls_census::core::scanner::tools::{OpenSsl, SslScan};
use tls_census::lease::LeaseManager;
use tls_census::logging::initialize_logging;
use tls_census::seed::read_seed_file;
use tls_census::store::postgres::PostgresStore;
use tls_census::store::DomainBacklog;
use tls_census::worker::{IdlePolicy, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = initialize_logging()?;
    let settings = Settings::from_env().wrap_err("invalid configuration")?;
    info!(log = %log_path.display(), workers = settings.workers, source = %settings.source, "Starting TLS census.");

    tokio::fs::create_dir_all(&settings.scratch_dir)
        .await
        .wrap_err_with(|| format!("cannot create scratch dir {}", settings.scratch_dir.display()))?;

    let store = Arc::new(
        PostgresStore::connect(&settings.database_url, settings.workers as u32 + 1)
            .await
            .wrap_err("backlog store unavailable")?,
    );

    if let Some(seed_file) = &settings.seed_file {
        let names = read_seed_file(seed_file)
            .await
            .wrap_err_with(|| format!("cannot read seed file {}", seed_file.display()))?;
        let added = store.seed(&names).await?;
        info!(seed = %seed_file.display(), listed = names.len(), added, "Seeded backlog.");
    }

    let scanner = Arc::new(build_scanner(&settings));
    let leases = LeaseManager::new(store.clone()).with_stale_after(settings.lease_ttl);
    let idle = IdlePolicy {
        poll_interval: settings.poll_interval,
        exit_when_empty: settings.exit_when_empty,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = JoinSet::new();
    for id in 0..settings.workers {
        let worker = Worker::new(id, leases.clone(), scanner.clone(), store.clone(), idle);
        let shutdown = shutdown_rx.clone();
        workers.spawn(async move { worker.run(shutdown).await });
    }

    let mut failure = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupt received; finishing current cycles.");
                let _ = shutdown_tx.send(true);
                break;
            }
            joined = workers.join_next() => match joined {
                None => break,
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(e))) => {
                    error!(error = %e, "Worker stopped: store unavailable.");
                    let _ = shutdown_tx.send(true);
                    failure = Some(eyre!(e));
                    break;
                }
                Some(Err(e)) => {
                    error!(error = %e, "Worker task failed.");
                    let _ = shutdown_tx.send(true);
                    failure = Some(eyre!(e));
                    break;
                }
            }
        }
    }

    while let Some(joined) = workers.join_next().await {
        if let Ok(Err(e)) = joined {
            error!(error = %e, "Worker stopped: store unavailable.");
        }
    }
    store.close().await;
    info!("TLS census stopped.");

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn build_scanner(settings: &Settings) -> Scanner {
    let extractor: Arc<dyn CertificateExtractor> = match settings.key_extractor {
        KeyExtractorKind::Text => Arc::new(TextDumpExtractor),
        KeyExtractorKind::X509 => Arc::new(X509Extractor),
    };
    Scanner::new(
        Arc::new(SslScan::new(&settings.sslscan, settings.tool_timeout)),
        Arc::new(OpenSsl::new(&settings.openssl, settings.tool_timeout)),
        extractor,
        &settings.scratch_dir,
        settings.source.clone(),
    )
}
