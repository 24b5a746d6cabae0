//! Startup validation of a loaded configuration.

use serde::Serialize;
use std::fs;
use std::path::Path;

use super::Config;

/// Outcome of [`validate_config`]
///
/// Errors stop the program; warnings are reported and the run continues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a configuration for problems that would make a run fail or degrade.
///
/// When the cache is enabled its directory is created if needed and probed
/// for writability.
pub fn validate_config(config: &Config) -> ConfigReport {
    let mut report = ConfigReport::default();

    if config.http.timeout_seconds == 0 {
        report
            .errors
            .push("http.timeout_seconds must be greater than zero".to_string());
    }

    if config.search.default_limit == 0 {
        report
            .errors
            .push("search.default_limit must be greater than zero".to_string());
    }

    if config.search.concurrency == 0 {
        report
            .errors
            .push("search.concurrency must be greater than zero".to_string());
    }

    if config.cache.enabled {
        if config.cache.ttl_hours == 0 {
            report
                .warnings
                .push("cache.ttl_hours is 0; cached results will never be reused".to_string());
        }

        let dir = config.cache.resolved_directory();
        if let Err(e) = check_writable(&dir) {
            report.errors.push(format!(
                "cache directory {} is not writable: {}",
                dir.display(),
                e
            ));
        }
    }

    let credentials = &config.credentials;
    if credentials.semantic_scholar_api_key.is_none() {
        report.warnings.push(
            "S2_API_KEY not set; Semantic Scholar requests are limited to one every 10 seconds"
                .to_string(),
        );
    }
    if credentials.openalex_email.is_none() {
        report.warnings.push(
            "OPENALEX_EMAIL not set; OpenAlex requests use the slower anonymous pool".to_string(),
        );
    }
    if credentials.crossref_mailto.is_none() {
        report.warnings.push(
            "CROSSREF_MAILTO not set; CrossRef requests use the slower anonymous pool".to_string(),
        );
    }
    if credentials.pubmed_api_key.is_none() {
        report.warnings.push(
            "PUBMED_API_KEY not set; PubMed requests are limited to three per second".to_string(),
        );
    }

    for problem in &report.errors {
        tracing::error!("Configuration error: {}", problem);
    }
    for problem in &report.warnings {
        tracing::warn!("Configuration warning: {}", problem);
    }

    report
}

fn check_writable(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    tempfile::tempfile_in(dir).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.cache.directory = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn test_missing_credentials_are_warnings() {
        let dir = tempdir().unwrap();
        let report = validate_config(&config_in(dir.path()));

        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 4);
        assert!(report.warnings[0].contains("S2_API_KEY"));
        assert!(report.warnings[3].contains("PUBMED_API_KEY"));
    }

    #[test]
    fn test_full_credentials_have_no_warnings() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.credentials.semantic_scholar_api_key = Some("key".to_string());
        config.credentials.openalex_email = Some("me@example.org".to_string());
        config.credentials.crossref_mailto = Some("me@example.org".to_string());
        config.credentials.pubmed_api_key = Some("ncbi-key".to_string());

        let report = validate_config(&config);
        assert!(report.is_ok());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.http.timeout_seconds = 0;

        let report = validate_config(&config);
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("timeout"));
    }

    #[test]
    fn test_unwritable_cache_dir_is_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let report = validate_config(&config_in(&blocker.join("cache")));
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("not writable"));
    }

    #[test]
    fn test_disabled_cache_skips_directory_check() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let mut config = config_in(&blocker.join("cache"));
        config.cache.enabled = false;

        assert!(validate_config(&config).is_ok());
    }
}
