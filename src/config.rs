use crate::error::{Result, SaverError};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub store: StoreConfig,
}

/// Locations of the reference tables, scan feeds, and generated artifacts.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the curated reference tables (agencies.csv etc.)
    pub include_dir: PathBuf,
    /// Directory shared with the scan tools (feeds in, artifacts out)
    pub shared_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub database: String,
    pub host: String,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            SaverError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

impl PathsConfig {
    pub fn agencies_file(&self) -> PathBuf {
        self.include_dir.join("agencies.csv")
    }

    /// Ordered substring rewrites applied to agency names before id lookup.
    /// Optional; absent file means no rewrites.
    pub fn agency_rewrites_file(&self) -> PathBuf {
        self.include_dir.join("agency-rewrites.csv")
    }

    /// Wholesale name overrides for organizations outside the stakeholder
    /// program. Optional.
    pub fn non_stakeholders_file(&self) -> PathBuf {
        self.include_dir.join("non-stakeholders.csv")
    }

    pub fn current_federal_file(&self) -> PathBuf {
        self.shared_dir.join("artifacts/current-federal_modified.csv")
    }

    pub fn unique_agencies_file(&self) -> PathBuf {
        self.shared_dir.join("artifacts/unique-agencies.csv")
    }

    pub fn clean_current_federal_file(&self) -> PathBuf {
        self.shared_dir.join("artifacts/clean-current-federal.csv")
    }

    pub fn feed_results_file(&self, feed_file: &str) -> PathBuf {
        self.shared_dir.join("artifacts/results").join(feed_file)
    }
}
