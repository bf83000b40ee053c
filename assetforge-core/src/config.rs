//! Environment configuration
//!
//! Loaded from a camelCase JSON file. Relative search roots resolve against
//! the directory containing the config file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engines::Locals;
use crate::error::{AssetError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Search roots, highest precedence first.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Extra or overriding extension -> MIME mappings.
    #[serde(default)]
    pub mime_types: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub cache: bool,
    #[serde(default)]
    pub locals: Locals,
}

fn default_true() -> bool { true }

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            paths: vec![],
            mime_types: BTreeMap::new(),
            cache: true,
            locals: Locals::new(),
        }
    }
}

impl EnvironmentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        let mut config: Self = serde_json::from_str(&content).map_err(|e| AssetError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(dir) = path.parent() {
            config.paths = config
                .paths
                .into_iter()
                .map(|p| if p.is_relative() { dir.join(p) } else { p })
                .collect();
        }
        Ok(config)
    }
}
