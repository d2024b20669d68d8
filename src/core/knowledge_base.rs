//! This module is the static reference table of cipher suites.
//! It maps each suite name, as the probe tool prints it (OpenSSL naming),
//! to the algorithms the suite negotiates. The table is read-only input: the
//! scanner records what it finds and never edits these entries.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The cryptographic building blocks of a single cipher suite.
#[derive(Debug, PartialEq, Eq)]
pub struct CipherSuiteDetail {
    /// The suite name in OpenSSL notation (e.g., "ECDHE-RSA-AES128-GCM-SHA256").
    pub name: &'static str,
    /// Key-exchange algorithm.
    pub kx: &'static str,
    /// Authentication algorithm.
    pub au: &'static str,
    /// Bulk encryption algorithm with its key size.
    pub enc: &'static str,
    /// Message authentication algorithm; "AEAD" for authenticated ciphers.
    pub mac: &'static str,
    /// Whether the suite is a legacy export-grade suite.
    pub export: bool,
}

macro_rules! suite {
    ($name:literal, $kx:literal, $au:literal, $enc:literal, $mac:literal) => {
        CipherSuiteDetail { name: $name, kx: $kx, au: $au, enc: $enc, mac: $mac, export: false }
    };
    ($name:literal, $kx:literal, $au:literal, $enc:literal, $mac:literal, export) => {
        CipherSuiteDetail { name: $name, kx: $kx, au: $au, enc: $enc, mac: $mac, export: true }
    };
}

/// The reference table itself.
static CIPHER_SUITES: &[CipherSuiteDetail] = &[
    // --- TLS 1.3 ---
    suite!("TLS_AES_256_GCM_SHA384", "any", "any", "AESGCM(256)", "AEAD"),
    suite!("TLS_CHACHA20_POLY1305_SHA256", "any", "any", "CHACHA20/POLY1305(256)", "AEAD"),
    suite!("TLS_AES_128_GCM_SHA256", "any", "any", "AESGCM(128)", "AEAD"),
    suite!("TLS_AES_128_CCM_SHA256", "any", "any", "AESCCM(128)", "AEAD"),
    suite!("TLS_AES_128_CCM_8_SHA256", "any", "any", "AESCCM8(128)", "AEAD"),

    // --- Ephemeral elliptic-curve key exchange ---
    suite!("ECDHE-ECDSA-AES256-GCM-SHA384", "ECDH", "ECDSA", "AESGCM(256)", "AEAD"),
    suite!("ECDHE-RSA-AES256-GCM-SHA384", "ECDH", "RSA", "AESGCM(256)", "AEAD"),
    suite!("ECDHE-ECDSA-CHACHA20-POLY1305", "ECDH", "ECDSA", "CHACHA20/POLY1305(256)", "AEAD"),
    suite!("ECDHE-RSA-CHACHA20-POLY1305", "ECDH", "RSA", "CHACHA20/POLY1305(256)", "AEAD"),
    suite!("ECDHE-ECDSA-AES128-GCM-SHA256", "ECDH", "ECDSA", "AESGCM(128)", "AEAD"),
    suite!("ECDHE-RSA-AES128-GCM-SHA256", "ECDH", "RSA", "AESGCM(128)", "AEAD"),
    suite!("ECDHE-ECDSA-AES256-SHA384", "ECDH", "ECDSA", "AES(256)", "SHA384"),
    suite!("ECDHE-RSA-AES256-SHA384", "ECDH", "RSA", "AES(256)", "SHA384"),
    suite!("ECDHE-ECDSA-AES128-SHA256", "ECDH", "ECDSA", "AES(128)", "SHA256"),
    suite!("ECDHE-RSA-AES128-SHA256", "ECDH", "RSA", "AES(128)", "SHA256"),
    suite!("ECDHE-ECDSA-AES256-SHA", "ECDH", "ECDSA", "AES(256)", "SHA1"),
    suite!("ECDHE-RSA-AES256-SHA", "ECDH", "RSA", "AES(256)", "SHA1"),
    suite!("ECDHE-ECDSA-AES128-SHA", "ECDH", "ECDSA", "AES(128)", "SHA1"),
    suite!("ECDHE-RSA-AES128-SHA", "ECDH", "RSA", "AES(128)", "SHA1"),
    suite!("ECDHE-ECDSA-CAMELLIA256-SHA384", "ECDH", "ECDSA", "Camellia(256)", "SHA384"),
    suite!("ECDHE-RSA-CAMELLIA256-SHA384", "ECDH", "RSA", "Camellia(256)", "SHA384"),
    suite!("ECDHE-ECDSA-CAMELLIA128-SHA256", "ECDH", "ECDSA", "Camellia(128)", "SHA256"),
    suite!("ECDHE-RSA-CAMELLIA128-SHA256", "ECDH", "RSA", "Camellia(128)", "SHA256"),
    suite!("ECDHE-ECDSA-DES-CBC3-SHA", "ECDH", "ECDSA", "3DES(168)", "SHA1"),
    suite!("ECDHE-RSA-DES-CBC3-SHA", "ECDH", "RSA", "3DES(168)", "SHA1"),
    suite!("ECDHE-ECDSA-RC4-SHA", "ECDH", "ECDSA", "RC4(128)", "SHA1"),
    suite!("ECDHE-RSA-RC4-SHA", "ECDH", "RSA", "RC4(128)", "SHA1"),
    suite!("ECDHE-ECDSA-NULL-SHA", "ECDH", "ECDSA", "None", "SHA1"),
    suite!("ECDHE-RSA-NULL-SHA", "ECDH", "RSA", "None", "SHA1"),

    // --- Ephemeral finite-field key exchange ---
    suite!("DHE-RSA-AES256-GCM-SHA384", "DH", "RSA", "AESGCM(256)", "AEAD"),
    suite!("DHE-DSS-AES256-GCM-SHA384", "DH", "DSS", "AESGCM(256)", "AEAD"),
    suite!("DHE-RSA-CHACHA20-POLY1305", "DH", "RSA", "CHACHA20/POLY1305(256)", "AEAD"),
    suite!("DHE-RSA-AES128-GCM-SHA256", "DH", "RSA", "AESGCM(128)", "AEAD"),
    suite!("DHE-DSS-AES128-GCM-SHA256", "DH", "DSS", "AESGCM(128)", "AEAD"),
    suite!("DHE-RSA-AES256-SHA256", "DH", "RSA", "AES(256)", "SHA256"),
    suite!("DHE-DSS-AES256-SHA256", "DH", "DSS", "AES(256)", "SHA256"),
    suite!("DHE-RSA-AES128-SHA256", "DH", "RSA", "AES(128)", "SHA256"),
    suite!("DHE-DSS-AES128-SHA256", "DH", "DSS", "AES(128)", "SHA256"),
    suite!("DHE-RSA-AES256-SHA", "DH", "RSA", "AES(256)", "SHA1"),
    suite!("DHE-DSS-AES256-SHA", "DH", "DSS", "AES(256)", "SHA1"),
    suite!("DHE-RSA-AES128-SHA", "DH", "RSA", "AES(128)", "SHA1"),
    suite!("DHE-DSS-AES128-SHA", "DH", "DSS", "AES(128)", "SHA1"),
    suite!("DHE-RSA-CAMELLIA256-SHA", "DH", "RSA", "Camellia(256)", "SHA1"),
    suite!("DHE-DSS-CAMELLIA256-SHA", "DH", "DSS", "Camellia(256)", "SHA1"),
    suite!("DHE-RSA-CAMELLIA128-SHA", "DH", "RSA", "Camellia(128)", "SHA1"),
    suite!("DHE-DSS-CAMELLIA128-SHA", "DH", "DSS", "Camellia(128)", "SHA1"),
    suite!("DHE-RSA-SEED-SHA", "DH", "RSA", "SEED(128)", "SHA1"),
    suite!("EDH-RSA-DES-CBC3-SHA", "DH", "RSA", "3DES(168)", "SHA1"),
    suite!("EDH-DSS-DES-CBC3-SHA", "DH", "DSS", "3DES(168)", "SHA1"),
    suite!("EDH-RSA-DES-CBC-SHA", "DH", "RSA", "DES(56)", "SHA1"),
    suite!("EDH-DSS-DES-CBC-SHA", "DH", "DSS", "DES(56)", "SHA1"),

    // --- Static RSA key exchange ---
    suite!("AES256-GCM-SHA384", "RSA", "RSA", "AESGCM(256)", "AEAD"),
    suite!("AES128-GCM-SHA256", "RSA", "RSA", "AESGCM(128)", "AEAD"),
    suite!("AES256-SHA256", "RSA", "RSA", "AES(256)", "SHA256"),
    suite!("AES128-SHA256", "RSA", "RSA", "AES(128)", "SHA256"),
    suite!("AES256-SHA", "RSA", "RSA", "AES(256)", "SHA1"),
    suite!("AES128-SHA", "RSA", "RSA", "AES(128)", "SHA1"),
    suite!("CAMELLIA256-SHA", "RSA", "RSA", "Camellia(256)", "SHA1"),
    suite!("CAMELLIA128-SHA", "RSA", "RSA", "Camellia(128)", "SHA1"),
    suite!("SEED-SHA", "RSA", "RSA", "SEED(128)", "SHA1"),
    suite!("IDEA-CBC-SHA", "RSA", "RSA", "IDEA(128)", "SHA1"),
    suite!("DES-CBC3-SHA", "RSA", "RSA", "3DES(168)", "SHA1"),
    suite!("RC4-SHA", "RSA", "RSA", "RC4(128)", "SHA1"),
    suite!("RC4-MD5", "RSA", "RSA", "RC4(128)", "MD5"),
    suite!("DES-CBC-SHA", "RSA", "RSA", "DES(56)", "SHA1"),
    suite!("NULL-SHA256", "RSA", "RSA", "None", "SHA256"),
    suite!("NULL-SHA", "RSA", "RSA", "None", "SHA1"),
    suite!("NULL-MD5", "RSA", "RSA", "None", "MD5"),

    // --- Anonymous (unauthenticated) suites ---
    suite!("AECDH-AES256-SHA", "ECDH", "None", "AES(256)", "SHA1"),
    suite!("AECDH-AES128-SHA", "ECDH", "None", "AES(128)", "SHA1"),
    suite!("AECDH-DES-CBC3-SHA", "ECDH", "None", "3DES(168)", "SHA1"),
    suite!("AECDH-RC4-SHA", "ECDH", "None", "RC4(128)", "SHA1"),
    suite!("AECDH-NULL-SHA", "ECDH", "None", "None", "SHA1"),
    suite!("ADH-AES256-GCM-SHA384", "DH", "None", "AESGCM(256)", "AEAD"),
    suite!("ADH-AES128-GCM-SHA256", "DH", "None", "AESGCM(128)", "AEAD"),
    suite!("ADH-AES256-SHA", "DH", "None", "AES(256)", "SHA1"),
    suite!("ADH-AES128-SHA", "DH", "None", "AES(128)", "SHA1"),
    suite!("ADH-DES-CBC3-SHA", "DH", "None", "3DES(168)", "SHA1"),
    suite!("ADH-RC4-MD5", "DH", "None", "RC4(128)", "MD5"),

    // --- Pre-shared key ---
    suite!("PSK-AES256-CBC-SHA", "PSK", "PSK", "AES(256)", "SHA1"),
    suite!("PSK-AES128-CBC-SHA", "PSK", "PSK", "AES(128)", "SHA1"),
    suite!("PSK-3DES-EDE-CBC-SHA", "PSK", "PSK", "3DES(168)", "SHA1"),
    suite!("PSK-RC4-SHA", "PSK", "PSK", "RC4(128)", "SHA1"),

    // --- Export grade ---
    suite!("EXP-EDH-RSA-DES-CBC-SHA", "DH(512)", "RSA", "DES(40)", "SHA1", export),
    suite!("EXP-EDH-DSS-DES-CBC-SHA", "DH(512)", "DSS", "DES(40)", "SHA1", export),
    suite!("EXP-ADH-DES-CBC-SHA", "DH(512)", "None", "DES(40)", "SHA1", export),
    suite!("EXP-ADH-RC4-MD5", "DH(512)", "None", "RC4(40)", "MD5", export),
    suite!("EXP-DES-CBC-SHA", "RSA(512)", "RSA", "DES(40)", "SHA1", export),
    suite!("EXP-RC2-CBC-MD5", "RSA(512)", "RSA", "RC2(40)", "MD5", export),
    suite!("EXP-RC4-MD5", "RSA(512)", "RSA", "RC4(40)", "MD5", export),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static CipherSuiteDetail>> =
    Lazy::new(|| CIPHER_SUITES.iter().map(|s| (s.name, s)).collect());

/// Retrieves the reference entry for a cipher suite.
///
/// # Arguments
///
/// * `name` - The suite name exactly as the probe tool reports it.
///
/// # Returns
///
/// An `Option` containing the `CipherSuiteDetail` if the suite is known,
/// or `None` if it is missing from the table.
pub fn get_cipher_detail(name: &str) -> Option<&'static CipherSuiteDetail> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn suite_names_are_unique() {
        let names: HashSet<_> = CIPHER_SUITES.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), CIPHER_SUITES.len());
    }

    #[test]
    fn looks_up_known_suite() {
        let detail = get_cipher_detail("ECDHE-RSA-AES128-GCM-SHA256").unwrap();
        assert_eq!(detail.kx, "ECDH");
        assert_eq!(detail.au, "RSA");
        assert_eq!(detail.enc, "AESGCM(128)");
        assert_eq!(detail.mac, "AEAD");
        assert!(!detail.export);
    }

    #[test]
    fn export_suites_are_flagged() {
        assert!(get_cipher_detail("EXP-RC4-MD5").unwrap().export);
    }

    #[test]
    fn unknown_suite_is_none() {
        assert!(get_cipher_detail("NOT-A-REAL-SUITE").is_none());
        assert!(get_cipher_detail("ecdhe-rsa-aes128-gcm-sha256").is_none());
    }
}
