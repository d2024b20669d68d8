// src/lib.rs

//! Continuous TLS census: leases domains from a shared backlog, probes them
//! with `sslscan` and `openssl`, enriches the cipher list from a static
//! reference table and stores one scan record per cycle.

pub mod config;
pub mod core;
pub mod lease;
pub mod logging;
pub mod seed;
pub mod store;
pub mod worker;
