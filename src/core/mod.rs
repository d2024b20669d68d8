// src/core/mod.rs

/// Data structures shared by the whole pipeline: domains, raw and enriched
/// cipher entries, certificate summaries and the persisted `ScanRecord`.
pub mod models;

/// The scan pipeline itself: external tools, report parsing, certificate
/// extraction and cipher enrichment.
pub mod scanner;

/// The static reference table of cipher-suite properties.
pub mod knowledge_base;
