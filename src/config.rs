//! Repository configuration surface: hash algorithm, metadata connection
//! string, scan progress interval, default merge diff strategy, and the
//! recursive watcher flag. Loadable from TOML/JSON via `serde` and otherwise
//! constructed with `Default`, mirroring the teacher crate's config pattern.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diff::DiffStrategyKind;
use crate::hash::HashAlgorithm;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LinageConfig {
    pub hash_algorithm: HashAlgorithm,
    pub metadata_connection: String,
    pub scan_progress_interval: usize,
    pub default_merge_strategy: DiffStrategyKind,
    pub watcher_recursive: bool,
}

impl LinageConfig {
    /// Builds the default config rooted at `repo_root`, pointing the
    /// metadata connection at `.linage/metadata.db` under it.
    pub fn for_repo_root(repo_root: &std::path::Path) -> Self {
        let db_path = repo_root.join(".linage").join("metadata.db");
        Self {
            metadata_connection: format!("sqlite://{}?mode=rwc", db_path.display()),
            ..Self::default()
        }
    }

    pub fn linage_dir(repo_root: &std::path::Path) -> PathBuf {
        repo_root.join(".linage")
    }

    pub fn objects_dir(repo_root: &std::path::Path) -> PathBuf {
        Self::linage_dir(repo_root).join("objects")
    }

    pub fn logs_dir(repo_root: &std::path::Path) -> PathBuf {
        Self::linage_dir(repo_root).join("logs")
    }

    pub fn backups_dir(repo_root: &std::path::Path) -> PathBuf {
        Self::linage_dir(repo_root).join("backups")
    }
}

impl Default for LinageConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            metadata_connection: "sqlite://./.linage/metadata.db?mode=rwc".to_string(),
            scan_progress_interval: 50,
            default_merge_strategy: DiffStrategyKind::Patience,
            watcher_recursive: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = LinageConfig::default();
        assert_eq!(cfg.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(cfg.scan_progress_interval, 50);
        assert_eq!(cfg.default_merge_strategy, DiffStrategyKind::Patience);
        assert!(cfg.watcher_recursive);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = LinageConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: LinageConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scan_progress_interval, cfg.scan_progress_interval);
    }
}
