// src/seed.rs

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

/// Reduces one seed-list line to a bare host name.
///
/// Blank lines and `#` comments yield `None`. Lines may be plain hosts,
/// `host:port`, or full URLs; only the host is kept, lowercased.
pub fn normalize_domain(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let with_scheme = if line.contains("://") {
        line.to_string()
    } else {
        format!("https://{}", line)
    };

    match Url::parse(&with_scheme) {
        Ok(url) => url.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()),
        Err(e) => {
            warn!(line, error = %e, "Skipping unparsable seed entry.");
            None
        }
    }
}

/// Reads a seed list into a sorted, de-duplicated set of host names.
pub async fn read_seed_file(path: &Path) -> std::io::Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let names: BTreeSet<String> = raw.lines().filter_map(normalize_domain).collect();
    debug!(path = %path.display(), domains = names.len(), "Read seed list.");
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hosts_and_urls() {
        assert_eq!(normalize_domain("example.com"), Some("example.com".into()));
        assert_eq!(normalize_domain("  Example.COM  "), Some("example.com".into()));
        assert_eq!(normalize_domain("https://www.example.com/path?q=1"), Some("www.example.com".into()));
        assert_eq!(normalize_domain("example.com:8443"), Some("example.com".into()));
    }

    #[test]
    fn skips_comments_and_blanks() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("# top sites"), None);
    }

    #[tokio::test]
    async fn seed_file_is_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.txt");
        tokio::fs::write(&path, "b.example\n# comment\na.example\nB.example\n\n").await.unwrap();

        let names = read_seed_file(&path).await.unwrap();
        assert_eq!(names, vec!["a.example".to_string(), "b.example".to_string()]);
    }
}
