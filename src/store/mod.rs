// src/store/mod.rs

//! Persistence seams. The domain backlog and the scan log are traits so the
//! worker loop can be driven by Postgres in production and by an in-memory
//! store in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::models::{Domain, ScanRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("could not encode scan record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A domain handed out by `DomainBacklog::claim`.
///
/// `token` changes on every claim of the same domain, so a holder whose
/// lease was reclaimed and re-issued can no longer release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedDomain {
    pub domain: Domain,
    pub token: i64,
}

/// The shared backlog of domains and their lease flags.
///
/// Only `claim`, `release` and `reclaim_stale` ever write `in_progress` or
/// `last_scan_at`.
#[async_trait]
pub trait DomainBacklog: Send + Sync {
    /// Atomically picks the least recently scanned idle domain (never-scanned
    /// first) and marks it in progress. `None` when nothing is eligible.
    async fn claim(&self) -> Result<Option<ClaimedDomain>, StoreError>;

    /// Clears the lease and stamps `last_scan_at` with the current time, but
    /// only while `token` still names the current claim of `domain`.
    ///
    /// Returns `false` when the lease is no longer held by that claim.
    async fn release(&self, domain: &str, token: i64, success: bool) -> Result<bool, StoreError>;

    /// Clears leases held longer than `ttl`. Returns how many were cleared.
    async fn reclaim_stale(&self, ttl: Duration) -> Result<u64, StoreError>;

    /// Adds domains that are not yet known. Returns how many were added.
    async fn seed(&self, names: &[String]) -> Result<u64, StoreError>;
}

/// Append-only log of scan records.
#[async_trait]
pub trait ScanRepository: Send + Sync {
    async fn insert_scan(&self, record: &ScanRecord) -> Result<(), StoreError>;
}
