//! File locations and logging setup shared by the binaries.

use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

pub const RAW_CATALOG_ENV: &str = "OMEN_RAW_CATALOG";
pub const CATALOG_ENV: &str = "OMEN_CATALOG";
pub const INDEX_ENV: &str = "OMEN_INDEX";

pub const DEFAULT_RAW_CATALOG: &str = "default-cards.json";
pub const DEFAULT_CATALOG: &str = "default-cards-unique.json";
pub const DEFAULT_INDEX: &str = "SimilarCardsDf.bin";

/// Where the raw bulk file, the deduplicated catalog and the similarity
/// index live. Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub raw_catalog: PathBuf,
    pub catalog: PathBuf,
    pub index: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            raw_catalog: PathBuf::from(DEFAULT_RAW_CATALOG),
            catalog: PathBuf::from(DEFAULT_CATALOG),
            index: PathBuf::from(DEFAULT_INDEX),
        }
    }
}

impl Settings {
    /// Defaults overridden by `OMEN_RAW_CATALOG`, `OMEN_CATALOG` and `OMEN_INDEX`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };
        Self {
            raw_catalog: path(RAW_CATALOG_ENV, defaults.raw_catalog),
            catalog: path(CATALOG_ENV, defaults.catalog),
            index: path(INDEX_ENV, defaults.index),
        }
    }
}

/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.index, PathBuf::from("SimilarCardsDf.bin"));
    }

    #[test]
    fn environment_overrides_individual_paths() {
        let settings = Settings::from_lookup(|key| match key {
            CATALOG_ENV => Some("/data/unique.json".to_string()),
            INDEX_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(settings.catalog, PathBuf::from("/data/unique.json"));
        assert_eq!(settings.index, PathBuf::from(DEFAULT_INDEX));
        assert_eq!(settings.raw_catalog, PathBuf::from(DEFAULT_RAW_CATALOG));
    }
}
