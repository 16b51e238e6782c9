//! Configuration file for changebench.
//!
//! Every setting can come from a command-line flag, a `CHANGEBENCH_*`
//! environment variable, or this file, in that order. clap already merges
//! flags and environment; values still unset after that fall back to the file
//! and then to the built-in defaults.
//!
//! ```toml
//! [consume]
//! store = "bench.db"
//! full_document = "updateLookup"
//! batch_size = 100
//! idle_timeout_secs = 30
//!
//! [produce]
//! store = "bench.db"
//! documents = 1000
//! updates = 10000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub consume: ConsumeSection,
    pub produce: ProduceSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumeSection {
    pub store: Option<PathBuf>,
    pub feed: Option<String>,
    pub full_document: Option<String>,
    pub batch_size: Option<usize>,
    pub measured_operation: Option<String>,
    pub seeding_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub max_in_flight: Option<usize>,
    pub simulated_work_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProduceSection {
    pub store: Option<PathBuf>,
    pub out: Option<String>,
    pub documents: Option<usize>,
    pub updates: Option<usize>,
    pub drop_first: Option<bool>,
    pub update_interval_ms: Option<u64>,
    pub payload_bytes: Option<usize>,
}

impl FileConfig {
    /// Load `path`, or an empty config when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_no_path_is_empty() {
        assert_eq!(FileConfig::load(None).unwrap(), FileConfig::default());
    }

    #[test]
    fn test_load_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[consume]
full_document = "default"
batch_size = 50

[produce]
documents = 10
drop_first = false
"#
        )
        .unwrap();

        let config = FileConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.consume.full_document.as_deref(), Some("default"));
        assert_eq!(config.consume.batch_size, Some(50));
        assert_eq!(config.consume.store, None);
        assert_eq!(config.produce.documents, Some(10));
        assert_eq!(config.produce.drop_first, Some(false));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[consume]\nbatchsize = 3").unwrap();
        assert!(FileConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = FileConfig::load(Some(Path::new("/nonexistent/changebench.toml")));
        assert!(result.is_err());
    }
}
