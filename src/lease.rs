// src/lease.rs

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::models::Domain;
use crate::store::{ClaimedDomain, DomainBacklog, StoreError};

/// Exclusive ownership of one domain for one scan cycle.
///
/// A lease is only ended by `LeaseManager::release`. Dropping it unreleased
/// leaves the domain flagged in progress until a stale-lease sweep clears it.
#[must_use = "a lease must be released or the domain stays in progress"]
#[derive(Debug)]
pub struct Lease {
    domain: Domain,
    token: i64,
    released: bool,
}

impl Lease {
    pub fn name(&self) -> &str {
        &self.domain.name
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.released {
            warn!(domain = %self.domain.name, "Lease dropped without release; domain stays in progress.");
        }
    }
}

/// Hands out and takes back domain leases on a shared backlog.
#[derive(Clone)]
pub struct LeaseManager {
    backlog: Arc<dyn DomainBacklog>,
    stale_after: Option<Duration>,
}

impl LeaseManager {
    pub fn new(backlog: Arc<dyn DomainBacklog>) -> Self {
        Self { backlog, stale_after: None }
    }

    /// Clears leases older than `ttl` before every claim.
    pub fn with_stale_after(mut self, ttl: Option<Duration>) -> Self {
        self.stale_after = ttl;
        self
    }

    /// Claims the next eligible domain, or `None` if the backlog has none.
    pub async fn claim(&self) -> Result<Option<Lease>, StoreError> {
        if let Some(ttl) = self.stale_after {
            let reclaimed = self.backlog.reclaim_stale(ttl).await?;
            if reclaimed > 0 {
                warn!(reclaimed, ttl = ?ttl, "Reclaimed stale leases.");
            }
        }

        let lease = self.backlog.claim().await?.map(|claimed| {
            let ClaimedDomain { domain, token } = claimed;
            debug!(domain = %domain.name, token, last_scan_at = ?domain.last_scan_at, "Claimed domain.");
            Lease { domain, token, released: false }
        });
        Ok(lease)
    }

    /// Ends the lease: clears `in_progress` and stamps `last_scan_at`.
    ///
    /// If the lease was reclaimed and handed to another worker meanwhile, the
    /// domain is left alone for its new holder.
    pub async fn release(&self, mut lease: Lease, success: bool) -> Result<(), StoreError> {
        lease.released = true;
        if self.backlog.release(&lease.domain.name, lease.token, success).await? {
            info!(domain = %lease.domain.name, success, "Released domain.");
        } else {
            warn!(
                domain = %lease.domain.name,
                token = lease.token,
                "Lease was reclaimed before release; leaving domain to its new holder."
            );
        }
        Ok(())
    }
}
