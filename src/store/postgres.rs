// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, info};

use super::{ClaimedDomain, DomainBacklog, ScanRepository, StoreError};
use crate::core::models::{Domain, ScanRecord};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, sqlx::FromRow)]
struct DomainRow {
    name: String,
    in_progress: bool,
    last_scan_at: Option<DateTime<Utc>>,
    lease_seq: i64,
}

impl From<DomainRow> for ClaimedDomain {
    fn from(row: DomainRow) -> Self {
        ClaimedDomain {
            domain: Domain {
                name: row.name,
                in_progress: row.in_progress,
                last_scan_at: row.last_scan_at,
            },
            token: row.lease_seq,
        }
    }
}

/// Backlog and scan log kept in Postgres.
///
/// The pool is created once at startup and shared by every worker.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects, checks the server answers, and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("could not connect to Postgres: {e}")))?;

        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await?;
        MIGRATOR.run(&pool).await?;
        info!("Connected to Postgres and applied migrations.");
        Ok(Self::from_pool(pool))
    }

    /// Wraps an existing pool; the schema must already be migrated.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DomainBacklog for PostgresStore {
    async fn claim(&self) -> Result<Option<ClaimedDomain>, StoreError> {
        // Selection and lease happen in one statement; SKIP LOCKED keeps two
        // workers from ever picking the same row.
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            UPDATE domains
            SET in_progress = TRUE,
                claimed_at = NOW(),
                lease_seq = lease_seq + 1
            WHERE name = (
                SELECT name
                FROM domains
                WHERE in_progress = FALSE
                ORDER BY last_scan_at ASC NULLS FIRST, name ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
              AND in_progress = FALSE
            RETURNING name, in_progress, last_scan_at, lease_seq
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ClaimedDomain::from))
    }

    async fn release(&self, domain: &str, token: i64, success: bool) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE domains
            SET in_progress = FALSE,
                claimed_at = NULL,
                last_scan_at = NOW(),
                last_scan_succeeded = $3
            WHERE name = $1
              AND lease_seq = $2
            "#,
        )
        .bind(domain)
        .bind(token)
        .bind(success)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reclaim_stale(&self, ttl: Duration) -> Result<u64, StoreError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            UPDATE domains
            SET in_progress = FALSE,
                claimed_at = NULL
            WHERE in_progress = TRUE
              AND claimed_at IS NOT NULL
              AND claimed_at < NOW() - ($1::bigint) * INTERVAL '1 millisecond'
            "#,
        )
        .bind(ttl_ms)
        .execute(&self.pool)
        .await?;

        debug!(reclaimed = result.rows_affected(), "Stale lease sweep finished.");
        Ok(result.rows_affected())
    }

    async fn seed(&self, names: &[String]) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO domains (name)
            SELECT UNNEST($1::text[])
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(names)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ScanRepository for PostgresStore {
    async fn insert_scan(&self, record: &ScanRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scans (source, scanned_at, domain, ciphers, certificate)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.source)
        .bind(record.scanned_at)
        .bind(&record.domain)
        .bind(Json(&record.ciphers))
        .bind(Json(&record.certificate))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
