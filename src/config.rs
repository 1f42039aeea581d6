// ⚙️ Runtime configuration (environment + optional .env file)

use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "tredgate.db";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite file holding the key-value store (`TREDGATE_DB`)
    pub database_path: PathBuf,

    /// tracing filter directive (`RUST_LOG`)
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup("TREDGATE_DB") {
            Some(path) if path.trim().is_empty() => anyhow::bail!("TREDGATE_DB cannot be empty"),
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_DATABASE_PATH),
        };

        let log_filter = lookup("RUST_LOG")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Config {
            database_path,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("tredgate.db"));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("TREDGATE_DB", "/tmp/loans.db"),
            ("RUST_LOG", "tredgate_loans=debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/loans.db"));
        assert_eq!(config.log_filter, "tredgate_loans=debug");
    }

    #[test]
    fn test_blank_database_path_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("TREDGATE_DB", "  ")]));
        assert!(result.is_err());
    }
}
