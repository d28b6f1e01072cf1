use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub clustering: ClusteringConfig,
    pub store: StoreConfig,
    pub accessioning: AccessioningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Variants consumed per chunk; a chunk is also the unit of retry
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default store directory when the CLI flag is omitted
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessioningConfig {
    /// First clustered accession value this deployment may issue
    pub first_accession: u64,
    /// Exclusive upper bound of the issuable range
    pub max_accession: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clustering: ClusteringConfig { chunk_size: 1000 },
            store: StoreConfig { path: None },
            accessioning: AccessioningConfig {
                first_accession: 3_000_000_000,
                max_accession: u64::MAX,
            },
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::LodestoneError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::LodestoneError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::LodestoneError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::LodestoneError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
