//! Engine configuration
//!
//! ```rust
//! use nexus_core::{EmbeddingConfig, NexusConfig};
//!
//! let config = NexusConfig::default()
//!     .with_data_dir("/tmp/nexus")
//!     .with_embedding(EmbeddingConfig::default().with_dimensions(16).with_num_walks(10));
//!
//! assert!(config.audit_chain_path().ends_with("audit_chain.json"));
//! ```

use crate::{NexusError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "NEXUS_DATA_DIR";

/// Walk and skip-gram parameters for the embedding predictor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding vector length
    pub dimensions: usize,
    /// Nodes per random walk
    pub walk_length: usize,
    /// Walks started from each node
    pub num_walks: usize,
    /// Skip-gram context window (each side)
    pub window: usize,
    /// Return parameter `p`
    pub return_param: f64,
    /// In-out parameter `q`
    pub in_out_param: f64,
    /// Negative samples per positive pair
    pub negative_samples: usize,
    /// Passes over the walk corpus
    pub epochs: usize,
    /// Initial learning rate, decayed linearly to 1e-4 of itself
    pub learning_rate: f64,
    /// Graphs with fewer nodes are not trained
    pub min_nodes: usize,
    /// Seed string for walks and vector initialisation
    pub seed: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            dimensions: 64,
            walk_length: 30,
            num_walks: 200,
            window: 10,
            return_param: 1.0,
            in_out_param: 1.0,
            negative_samples: 5,
            epochs: 1,
            learning_rate: 0.025,
            min_nodes: 5,
            seed: "pharmai-nexus-node2vec".to_string(),
        }
    }
}

impl EmbeddingConfig {
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.walk_length = walk_length;
        self
    }

    pub fn with_num_walks(mut self, num_walks: usize) -> Self {
        self.num_walks = num_walks;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set node2vec `p` and `q`
    pub fn with_bias(mut self, return_param: f64, in_out_param: f64) -> Self {
        self.return_param = return_param;
        self.in_out_param = in_out_param;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Reject parameter combinations training cannot use
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(NexusError::InvalidConfig("embedding.dimensions must be > 0".into()));
        }
        if self.walk_length < 2 {
            return Err(NexusError::InvalidConfig("embedding.walk_length must be >= 2".into()));
        }
        if self.window == 0 {
            return Err(NexusError::InvalidConfig("embedding.window must be > 0".into()));
        }
        if !(self.return_param > 0.0 && self.in_out_param > 0.0) {
            return Err(NexusError::InvalidConfig(
                "embedding.return_param and in_out_param must be positive".into(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(NexusError::InvalidConfig("embedding.learning_rate must be positive".into()));
        }
        Ok(())
    }
}

/// Top-level engine configuration, stored as JSON
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    /// Directory holding the catalog and the audit chain
    pub data_dir: PathBuf,
    /// Known-interaction CSV, relative to `data_dir`
    pub catalog_file: String,
    /// Persisted ledger, relative to `data_dir`
    pub audit_chain_file: String,
    /// Seed the graph with demonstration interactions when no catalog exists
    pub bootstrap_demo_graph: bool,
    /// Capacity of the resolver and pair-score caches
    pub cache_capacity: u64,
    pub embedding: EmbeddingConfig,
}

impl Default for NexusConfig {
    fn default() -> Self {
        NexusConfig {
            data_dir: PathBuf::from("./data"),
            catalog_file: "ddinter.csv".to_string(),
            audit_chain_file: "audit_chain.json".to_string(),
            bootstrap_demo_graph: true,
            cache_capacity: 1024,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl NexusConfig {
    /// Load a JSON config file; absent keys take their defaults
    ///
    /// `NEXUS_DATA_DIR` overrides `data_dir` after loading.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| NexusError::io(path, e))?;
        let config: NexusConfig = serde_json::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        config.with_env_overrides().validated()
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        NexusConfig::default().with_env_overrides().validated()
    }

    /// Apply `NEXUS_DATA_DIR` if set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                log::debug!("{} overrides data_dir with {}", DATA_DIR_ENV, dir);
                self.data_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_bootstrap_demo_graph(mut self, enabled: bool) -> Self {
        self.bootstrap_demo_graph = enabled;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn audit_chain_path(&self) -> PathBuf {
        self.data_dir.join(&self.audit_chain_file)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(NexusError::InvalidConfig("cache_capacity must be > 0".into()));
        }
        if self.audit_chain_file.trim().is_empty() {
            return Err(NexusError::InvalidConfig("audit_chain_file must not be empty".into()));
        }
        self.embedding.validate()
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NexusConfig::default();
        assert_eq!(config.catalog_path(), PathBuf::from("./data/ddinter.csv"));
        assert_eq!(config.audit_chain_path(), PathBuf::from("./data/audit_chain.json"));
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.embedding.walk_length, 30);
        assert_eq!(config.embedding.num_walks, 200);
        assert_eq!(config.embedding.window, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cache_capacity": 32, "embedding": {{"dimensions": 8}}}}"#).unwrap();

        let config = NexusConfig::load(file.path()).unwrap();
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.embedding.dimensions, 8);
        assert_eq!(config.embedding.walk_length, 30);
        assert_eq!(config.catalog_file, "ddinter.csv");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"embedding": {{"dimensions": 0}}}}"#).unwrap();
        assert!(matches!(
            NexusConfig::load(file.path()),
            Err(NexusError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NexusConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, NexusError::Io { .. }));
    }

    #[test]
    fn test_builder() {
        let config = NexusConfig::default()
            .with_data_dir("/srv/nexus")
            .with_cache_capacity(10)
            .with_bootstrap_demo_graph(false);
        assert_eq!(config.catalog_path(), PathBuf::from("/srv/nexus/ddinter.csv"));
        assert!(!config.bootstrap_demo_graph);
    }
}
