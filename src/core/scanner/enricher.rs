// src/core/scanner/enricher.rs

use tracing::debug;

use crate::core::knowledge_base::get_cipher_detail;
use crate::core::models::{CipherRecord, RawCipherEntry};

/// Turns raw cipher lines into persisted cipher records.
///
/// Known suites get their key-exchange, authentication, encryption, MAC and
/// export attributes from the reference table. Their key-exchange strength
/// is the ephemeral ECDHE bit count when reported, else the DHE bit count,
/// else the certificate's public-key length. Unknown suites keep only what
/// the report itself carried.
///
/// The output preserves input order and depends on nothing but the inputs.
pub fn enrich(entries: &[RawCipherEntry], certificate_bits: Option<u32>) -> Vec<CipherRecord> {
    entries
        .iter()
        .map(|entry| enrich_entry(entry, certificate_bits))
        .collect()
}

fn enrich_entry(entry: &RawCipherEntry, certificate_bits: Option<u32>) -> CipherRecord {
    let mut record = CipherRecord {
        status: entry.status,
        cipher: entry.cipher.clone(),
        protocol: entry.protocol.clone(),
        bits: entry.bits,
        kx: None,
        kx_strength: None,
        au: None,
        enc: None,
        mac: None,
        export: None,
    };

    let Some(detail) = get_cipher_detail(&entry.cipher) else {
        debug!(cipher = %entry.cipher, "Cipher suite not in reference table.");
        return record;
    };

    record.kx = Some(detail.kx.to_string());
    record.kx_strength = entry.ecdhe_bits.or(entry.dhe_bits).or(certificate_bits);
    record.au = Some(detail.au.to_string());
    record.enc = Some(detail.enc.to_string());
    record.mac = Some(detail.mac.to_string());
    record.export = Some(detail.export);
    record
}
