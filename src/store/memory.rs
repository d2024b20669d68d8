// src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{ClaimedDomain, DomainBacklog, ScanRepository, StoreError};
use crate::core::models::{Domain, ScanRecord};

#[derive(Debug)]
struct Entry {
    domain: Domain,
    claimed_at: Option<DateTime<Utc>>,
    last_scan_succeeded: Option<bool>,
    /// Bumped on every claim; the current value is the live lease token.
    lease_seq: i64,
}

impl Entry {
    fn new(name: String) -> Self {
        Self { domain: Domain::new(name), claimed_at: None, last_scan_succeeded: None, lease_seq: 0 }
    }
}

#[derive(Debug, Default)]
struct State {
    domains: BTreeMap<String, Entry>,
    scans: Vec<ScanRecord>,
}

/// A process-local backlog and scan log.
///
/// Every operation runs under one mutex that is never held across an await,
/// so `claim` is a single indivisible test-and-set. Failure switches let
/// callers simulate an unreachable store or a failing scan insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    fail_scan_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domains<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            for name in names {
                let name = name.into();
                state.domains.insert(name.clone(), Entry::new(name));
            }
        }
        store
    }

    /// Makes every backlog operation fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes `insert_scan` fail while leaving the backlog reachable.
    pub fn fail_scan_inserts(&self, fail: bool) {
        self.fail_scan_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn domain(&self, name: &str) -> Option<Domain> {
        self.state.lock().ok()?.domains.get(name).map(|e| e.domain.clone())
    }

    pub fn last_scan_succeeded(&self, name: &str) -> Option<bool> {
        self.state.lock().ok()?.domains.get(name).and_then(|e| e.last_scan_succeeded)
    }

    pub fn scans(&self) -> Vec<ScanRecord> {
        self.state.lock().map(|s| s.scans.clone()).unwrap_or_default()
    }

    /// Backdates a lease, as if the holder had claimed it `age` ago.
    pub fn age_lease(&self, name: &str, age: Duration) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(entry) = state.domains.get_mut(name) {
                let age = chrono::Duration::from_std(age).unwrap_or(chrono::Duration::zero());
                entry.claimed_at = entry.claimed_at.map(|at| at - age);
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl DomainBacklog for MemoryStore {
    async fn claim(&self) -> Result<Option<ClaimedDomain>, StoreError> {
        let mut state = self.lock()?;
        let next = state
            .domains
            .values_mut()
            .filter(|e| !e.domain.in_progress)
            .min_by(|a, b| {
                (a.domain.last_scan_at, &a.domain.name).cmp(&(b.domain.last_scan_at, &b.domain.name))
            });

        Ok(next.map(|entry| {
            entry.domain.in_progress = true;
            entry.claimed_at = Some(Utc::now());
            entry.lease_seq += 1;
            ClaimedDomain { domain: entry.domain.clone(), token: entry.lease_seq }
        }))
    }

    async fn release(&self, domain: &str, token: i64, success: bool) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let Some(entry) = state.domains.get_mut(domain).filter(|e| e.lease_seq == token) else {
            return Ok(false);
        };
        entry.domain.in_progress = false;
        entry.domain.last_scan_at = Some(Utc::now());
        entry.claimed_at = None;
        entry.last_scan_succeeded = Some(success);
        Ok(true)
    }

    async fn reclaim_stale(&self, ttl: Duration) -> Result<u64, StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Unavailable(format!("lease ttl out of range: {e}")))?;
        let cutoff = Utc::now() - ttl;
        let mut state = self.lock()?;
        let mut reclaimed = 0;
        for entry in state.domains.values_mut() {
            if entry.domain.in_progress && entry.claimed_at.is_some_and(|at| at < cutoff) {
                entry.domain.in_progress = false;
                entry.claimed_at = None;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    async fn seed(&self, names: &[String]) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let mut added = 0;
        for name in names {
            if !state.domains.contains_key(name) {
                state.domains.insert(name.clone(), Entry::new(name.clone()));
                added += 1;
            }
        }
        Ok(added)
    }
}

#[async_trait]
impl ScanRepository for MemoryStore {
    async fn insert_scan(&self, record: &ScanRecord) -> Result<(), StoreError> {
        if self.fail_scan_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scan insert rejected".into()));
        }
        self.lock()?.scans.push(record.clone());
        Ok(())
    }
}
