//! Configuration for cqpconc

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::concordance::{AttributeNames, DEFAULT_NUM_PER_PAGE, DEFAULT_WINDOW_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the cqp executable
    #[serde(default = "default_cqp_bin")]
    pub cqp_bin: PathBuf,

    /// CWB registry directory
    #[serde(default = "default_registry_dir")]
    pub registry_dir: PathBuf,

    /// Corpus to query
    #[serde(default)]
    pub corpus: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub log_level: Option<String>,

    /// Attribute names used for words, tags, boards and timestamps
    #[serde(default)]
    pub attributes: AttributeNames,

    /// Default paging and context settings
    #[serde(default)]
    pub defaults: QueryDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    /// Hits per page
    pub num_per_page: usize,

    /// Context tokens on each side of a hit
    pub window_size: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            num_per_page: DEFAULT_NUM_PER_PAGE,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

fn default_cqp_bin() -> PathBuf {
    PathBuf::from("/usr/local/bin/cqp")
}

fn default_registry_dir() -> PathBuf {
    PathBuf::from(cwb_cl::DEFAULT_REGISTRY)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cqp_bin: default_cqp_bin(),
            registry_dir: default_registry_dir(),
            corpus: None,
            log_level: None,
            attributes: AttributeNames::default(),
            defaults: QueryDefaults::default(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path)
                .context(format!("Failed to load config from {}", config_path.display()));
        }

        // Try default locations
        let default_paths = [
            Some(PathBuf::from("cqpconc.yml")),
            dirs::config_dir().map(|p| p.join("cqpconc").join("cqpconc.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
            }
        }

        Ok(Config::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Corpus name, or an error telling the user how to set one
    pub fn corpus(&self) -> Result<&str> {
        self.corpus
            .as_deref()
            .ok_or_else(|| eyre::eyre!("No corpus configured. Pass --corpus or set `corpus` in cqpconc.yml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cqp_bin, PathBuf::from("/usr/local/bin/cqp"));
        assert_eq!(config.attributes.board, "text_board");
        assert_eq!(config.defaults.num_per_page, 50);
        assert_eq!(config.defaults.window_size, 6);
        assert!(config.corpus().is_err());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cqpconc.yml");
        std::fs::write(
            &path,
            "corpus: BBS\nregistry_dir: /data/registry\nattributes:\n  time: text_date\ndefaults:\n  window_size: 3\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.corpus().unwrap(), "BBS");
        assert_eq!(config.registry_dir, PathBuf::from("/data/registry"));
        assert_eq!(config.attributes.time, "text_date");
        assert_eq!(config.attributes.word, "word");
        assert_eq!(config.defaults.window_size, 3);
        assert_eq!(config.defaults.num_per_page, 50);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cqpconc.yml");
        let config = Config {
            corpus: Some("bbs".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.corpus.as_deref(), Some("bbs"));
        assert_eq!(loaded.attributes, config.attributes);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(&temp.path().join("missing.yml"))).is_err());
    }
}
