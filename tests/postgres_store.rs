// tests/postgres_store.rs
//
// Run against a scratch database with:
//   DATABASE_URL=postgres://... cargo test --test postgres_store -- --ignored

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

use tls_census::core::models::{CertificateSummary, CipherRecord, CipherStatus, ScanRecord};
use tls_census::store::postgres::PostgresStore;
use tls_census::store::{DomainBacklog, ScanRepository, StoreError};

async fn seeded(pool: PgPool, names: &[&str]) -> Result<PostgresStore, StoreError> {
    let store = PostgresStore::from_pool(pool);
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    store.seed(&names).await?;
    Ok(store)
}

async fn row(pool: &PgPool, name: &str) -> Result<(bool, Option<DateTime<Utc>>, Option<bool>), sqlx::Error> {
    sqlx::query_as("SELECT in_progress, last_scan_at, last_scan_succeeded FROM domains WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn claims_follow_scan_age_then_name(pool: PgPool) -> Result<(), StoreError> {
    let store = seeded(pool, &["b.example", "a.example", "c.example"]).await?;

    let first = store.claim().await?.expect("eligible domain");
    assert_eq!(first.domain.name, "a.example");
    assert!(first.domain.in_progress);
    assert!(store.release("a.example", first.token, true).await?);

    let order: Vec<String> = [
        store.claim().await?.expect("b"),
        store.claim().await?.expect("c"),
        store.claim().await?.expect("a again"),
    ]
    .into_iter()
    .map(|c| c.domain.name)
    .collect();
    assert_eq!(order, ["b.example", "c.example", "a.example"]);
    assert!(store.claim().await?.is_none());
    Ok(())
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn concurrent_claims_never_share_a_row(pool: PgPool) -> Result<(), StoreError> {
    let store = seeded(pool, &["only.example"]).await?;
    let other = store.clone();

    let (a, b) = tokio::join!(store.claim(), other.claim());
    let winners = [a?, b?].into_iter().flatten().count();
    assert_eq!(winners, 1);
    Ok(())
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn many_workers_get_distinct_domains(pool: PgPool) -> Result<(), StoreError> {
    let names: Vec<String> = (0..6).map(|i| format!("host{i}.example")).collect();
    let store = PostgresStore::from_pool(pool);
    store.seed(&names).await?;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.claim().await }));
    }

    let mut claimed = Vec::new();
    for handle in handles {
        if let Some(c) = handle.await.expect("claim task")? {
            claimed.push(c.domain.name);
        }
    }
    claimed.sort();
    assert_eq!(claimed, names);
    Ok(())
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn release_stamps_and_rejects_stale_tokens(pool: PgPool) -> Result<(), StoreError> {
    let store = seeded(pool.clone(), &["a.example"]).await?;

    let claimed = store.claim().await?.expect("eligible domain");
    assert!(store.release("a.example", claimed.token, false).await?);

    let (in_progress, last_scan_at, succeeded) = row(&pool, "a.example").await?;
    assert!(!in_progress);
    assert!(last_scan_at.is_some());
    assert_eq!(succeeded, Some(false));

    let next = store.claim().await?.expect("eligible again");
    assert_ne!(next.token, claimed.token);
    assert!(!store.release("a.example", claimed.token, true).await?);
    assert!(row(&pool, "a.example").await?.0);

    assert!(!store.release("missing.example", 1, true).await?);
    Ok(())
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn reclaim_clears_only_expired_leases(pool: PgPool) -> Result<(), StoreError> {
    let store = seeded(pool.clone(), &["old.example", "young.example"]).await?;
    let old = store.claim().await?.expect("old");
    store.claim().await?.expect("young");

    sqlx::query("UPDATE domains SET claimed_at = NOW() - INTERVAL '10 minutes' WHERE name = $1")
        .bind("old.example")
        .execute(&pool)
        .await?;

    assert_eq!(store.reclaim_stale(Duration::from_secs(300)).await?, 1);
    assert!(!row(&pool, "old.example").await?.0);
    assert!(row(&pool, "young.example").await?.0);

    let successor = store.claim().await?.expect("reclaimed domain");
    assert_eq!(successor.domain.name, "old.example");
    assert!(!store.release("old.example", old.token, true).await?);
    assert!(row(&pool, "old.example").await?.0);
    Ok(())
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn seeding_skips_known_domains(pool: PgPool) -> Result<(), StoreError> {
    let store = seeded(pool, &["a.example", "b.example"]).await?;
    let added = store.seed(&["b.example".to_string(), "c.example".to_string()]).await?;
    assert_eq!(added, 1);
    Ok(())
}

#[sqlx::test(migrator = "tls_census::store::postgres::MIGRATOR")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn scan_records_land_as_jsonb(pool: PgPool) -> Result<(), StoreError> {
    let store = seeded(pool.clone(), &["example.com"]).await?;
    let known = CipherRecord {
        status: CipherStatus::Accepted,
        cipher: "ECDHE-RSA-AES128-GCM-SHA256".into(),
        protocol: "TLSv1.2".into(),
        bits: 128,
        kx: Some("ECDH".into()),
        kx_strength: Some(256),
        au: Some("RSA".into()),
        enc: Some("AESGCM(128)".into()),
        mac: Some("AEAD".into()),
        export: Some(false),
    };
    let unknown = CipherRecord {
        cipher: "VENDOR-SUITE".into(),
        kx: None,
        kx_strength: None,
        au: None,
        enc: None,
        mac: None,
        export: None,
        ..known.clone()
    };
    let record = ScanRecord {
        source: "top-7k.txt".into(),
        scanned_at: Utc::now(),
        domain: "example.com".into(),
        ciphers: vec![known, unknown],
        certificate: CertificateSummary {
            subject: "example.com".into(),
            issuer: "Example CA".into(),
            not_valid_before: "2024-01-01".into(),
            not_valid_after: "2030-01-01".into(),
            expired: false,
            signature_algorithm: "sha256WithRSAEncryption".into(),
            alt_names: None,
            public_key_algorithm: "RSA".into(),
            public_key_length: Some(2048),
        },
    };

    store.insert_scan(&record).await?;

    let (strength, unknown_has_kx, key_bits): (Option<String>, bool, Option<String>) = sqlx::query_as(
        r#"
        SELECT ciphers->0->>'kx_strength', ciphers->1 ? 'kx', certificate->>'public_key_length'
        FROM scans
        WHERE domain = $1
        "#,
    )
    .bind("example.com")
    .fetch_one(&pool)
    .await?;
    assert_eq!(strength.as_deref(), Some("256"));
    assert!(!unknown_has_kx);
    assert_eq!(key_bits.as_deref(), Some("2048"));
    Ok(())
}
