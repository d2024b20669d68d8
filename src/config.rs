// src/config.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::core::scanner::tools::TOOL_RUNS_PER_SCAN;
use crate::logging::get_data_dir;

const PREFIX: &str = "TLS_CENSUS_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required setting `{0}` is not set")]
    Missing(String),
    #[error("invalid value {value:?} for `{var}`")]
    Invalid { var: String, value: String },
    #[error("lease ttl {ttl:?} must exceed the longest possible scan cycle ({cycle:?})")]
    LeaseTooShort { ttl: Duration, cycle: Duration },
}

/// Which `CertificateExtractor` reads the public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum KeyExtractorKind {
    /// Scan the `openssl x509 -text` dump.
    #[default]
    Text,
    /// Decode the PEM with x509-parser.
    X509,
}

/// Process settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub scratch_dir: PathBuf,
    pub workers: usize,
    pub sslscan: PathBuf,
    pub openssl: PathBuf,
    pub seed_file: Option<PathBuf>,
    /// Tag written into every scan record.
    pub source: String,
    pub poll_interval: Duration,
    pub exit_when_empty: bool,
    pub lease_ttl: Option<Duration>,
    pub tool_timeout: Duration,
    pub key_extractor: KeyExtractorKind,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key/value source.
    ///
    /// `DATABASE_URL` is read unprefixed; everything else is `TLS_CENSUS_*`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{PREFIX}{name}")).filter(|v| !v.trim().is_empty());

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("DATABASE_URL".into()))?;

        let seed_file = get("SEED_FILE").map(PathBuf::from);
        let source = get("SOURCE")
            .or_else(|| {
                seed_file
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "backlog".to_string());

        let workers: usize = parsed(&get, "WORKERS")?.unwrap_or(1);
        if workers == 0 {
            return Err(ConfigError::Invalid { var: format!("{PREFIX}WORKERS"), value: "0".into() });
        }

        let tool_timeout = Duration::from_secs(parsed(&get, "TOOL_TIMEOUT_SECS")?.unwrap_or(300));
        let lease_ttl = parsed::<u64>(&get, "LEASE_TTL_SECS")?.map(Duration::from_secs);
        if let Some(ttl) = lease_ttl {
            // A live holder must never look stale: one cycle runs at most
            // TOOL_RUNS_PER_SCAN tool invocations, each bounded by the timeout.
            let cycle = tool_timeout * TOOL_RUNS_PER_SCAN;
            if ttl <= cycle {
                return Err(ConfigError::LeaseTooShort { ttl, cycle });
            }
        }

        Ok(Self {
            database_url,
            scratch_dir: get("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| get_data_dir().join("tmp")),
            workers,
            sslscan: get("SSLSCAN").map(PathBuf::from).unwrap_or_else(|| "sslscan".into()),
            openssl: get("OPENSSL").map(PathBuf::from).unwrap_or_else(|| "openssl".into()),
            seed_file,
            source,
            poll_interval: Duration::from_secs(parsed(&get, "POLL_SECS")?.unwrap_or(30)),
            exit_when_empty: parsed_flag(&get, "EXIT_WHEN_EMPTY")?.unwrap_or(false),
            lease_ttl,
            tool_timeout,
            key_extractor: parsed(&get, "KEY_EXTRACTOR")?.unwrap_or_default(),
        })
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, ConfigError> {
    get(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
                var: format!("{PREFIX}{name}"),
                value,
            })
        })
        .transpose()
}

fn parsed_flag(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<bool>, ConfigError> {
    get(name)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var: format!("{PREFIX}{name}"), value }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/tls")]).unwrap();
        assert_eq!(s.workers, 1);
        assert_eq!(s.sslscan, PathBuf::from("sslscan"));
        assert_eq!(s.openssl, PathBuf::from("openssl"));
        assert_eq!(s.source, "backlog");
        assert_eq!(s.poll_interval, Duration::from_secs(30));
        assert!(!s.exit_when_empty);
        assert_eq!(s.lease_ttl, None);
        assert_eq!(s.tool_timeout, Duration::from_secs(300));
        assert_eq!(s.key_extractor, KeyExtractorKind::Text);
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(settings(&[]), Err(ConfigError::Missing("DATABASE_URL".into())));
    }

    #[test]
    fn overrides_are_parsed() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://db/tls"),
            ("TLS_CENSUS_WORKERS", "4"),
            ("TLS_CENSUS_SEED_FILE", "/data/top-7k.txt"),
            ("TLS_CENSUS_EXIT_WHEN_EMPTY", "yes"),
            ("TLS_CENSUS_LEASE_TTL_SECS", "1500"),
            ("TLS_CENSUS_KEY_EXTRACTOR", "x509"),
            ("TLS_CENSUS_SCRATCH_DIR", "/var/tmp/tls"),
        ])
        .unwrap();
        assert_eq!(s.workers, 4);
        assert_eq!(s.source, "top-7k.txt");
        assert!(s.exit_when_empty);
        assert_eq!(s.lease_ttl, Some(Duration::from_secs(1500)));
        assert_eq!(s.key_extractor, KeyExtractorKind::X509);
        assert_eq!(s.scratch_dir, PathBuf::from("/var/tmp/tls"));
    }

    #[test]
    fn explicit_source_wins_over_seed_file_name() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://db/tls"),
            ("TLS_CENSUS_SEED_FILE", "/data/top-7k.txt"),
            ("TLS_CENSUS_SOURCE", "alexa"),
        ])
        .unwrap();
        assert_eq!(s.source, "alexa");
    }

    #[test]
    fn lease_ttl_must_outlast_a_full_cycle() {
        let err = settings(&[("DATABASE_URL", "x"), ("TLS_CENSUS_LEASE_TTL_SECS", "1200")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::LeaseTooShort { ttl: Duration::from_secs(1200), cycle: Duration::from_secs(1200) }
        );

        let s = settings(&[
            ("DATABASE_URL", "x"),
            ("TLS_CENSUS_TOOL_TIMEOUT_SECS", "30"),
            ("TLS_CENSUS_LEASE_TTL_SECS", "121"),
        ])
        .unwrap();
        assert_eq!(s.lease_ttl, Some(Duration::from_secs(121)));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = settings(&[("DATABASE_URL", "x"), ("TLS_CENSUS_WORKERS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = settings(&[("DATABASE_URL", "x"), ("TLS_CENSUS_WORKERS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = settings(&[("DATABASE_URL", "x"), ("TLS_CENSUS_KEY_EXTRACTOR", "asn1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
