//! Run configuration. Loaded from a JSON file; CLI flags override it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Input and output locations
    pub paths: PathsConfig,
    /// Logging
    pub log: LogConfig,
}

/// Directories not given explicitly sit under `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PathsFile")]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    /// NDJSON written by the on-chain and feed ingestion jobs
    pub ingest_dir: PathBuf,
    /// Checked-in sample events; also the default validation target
    pub fixtures_dir: PathBuf,
    /// Snapshot, feature and anomaly outputs
    pub features_dir: PathBuf,
}

#[derive(Deserialize)]
struct PathsFile {
    data_dir: Option<PathBuf>,
    ingest_dir: Option<PathBuf>,
    fixtures_dir: Option<PathBuf>,
    features_dir: Option<PathBuf>,
}

impl From<PathsFile> for PathsConfig {
    fn from(file: PathsFile) -> Self {
        let base = file.data_dir.unwrap_or_else(|| PathBuf::from("data"));
        let mut paths = Self::under(&base);
        if let Some(dir) = file.ingest_dir {
            paths.ingest_dir = dir;
        }
        if let Some(dir) = file.fixtures_dir {
            paths.fixtures_dir = dir;
        }
        if let Some(dir) = file.features_dir {
            paths.features_dir = dir;
        }
        paths
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::under(Path::new("data"))
    }
}

impl PathsConfig {
    /// Standard layout below one data directory.
    pub fn under(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            ingest_dir: data_dir.join("ingest"),
            fixtures_dir: data_dir.join("fixtures"),
            features_dir: data_dir.join("features"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SentinelConfig {
    /// Load from JSON file if present; otherwise return default. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&data).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let c = SentinelConfig::load(Path::new("nonexistent-sentinel.json")).unwrap();
        assert_eq!(c.paths.fixtures_dir, PathBuf::from("data/fixtures"));
        assert_eq!(c.log.level, "info");
        assert!(!c.log.json);
    }

    #[test]
    fn partial_file_fills_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        std::fs::write(&path, r#"{"log": {"json": true}, "paths": {"features_dir": "/tmp/out"}}"#).unwrap();

        let c = SentinelConfig::load(&path).unwrap();
        assert!(c.log.json);
        assert_eq!(c.log.level, "info");
        assert_eq!(c.paths.features_dir, PathBuf::from("/tmp/out"));
        assert_eq!(c.paths.ingest_dir, PathBuf::from("data/ingest"));
    }

    #[test]
    fn data_dir_moves_unset_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        std::fs::write(&path, r#"{"paths": {"data_dir": "/srv/sentinel", "fixtures_dir": "/opt/fx"}}"#).unwrap();

        let c = SentinelConfig::load(&path).unwrap();
        assert_eq!(c.paths.data_dir, PathBuf::from("/srv/sentinel"));
        assert_eq!(c.paths.ingest_dir, PathBuf::from("/srv/sentinel/ingest"));
        assert_eq!(c.paths.features_dir, PathBuf::from("/srv/sentinel/features"));
        assert_eq!(c.paths.fixtures_dir, PathBuf::from("/opt/fx"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SentinelConfig::load(&path), Err(Error::Config { .. })));
    }

    #[test]
    fn layout_under_data_dir() {
        let p = PathsConfig::under(Path::new("/srv/sentinel"));
        assert_eq!(p.ingest_dir, PathBuf::from("/srv/sentinel/ingest"));
        assert_eq!(p.features_dir, PathBuf::from("/srv/sentinel/features"));
    }
}
