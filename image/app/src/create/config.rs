/*++

Licensed under the Apache-2.0 license.

File Name:

   config.rs

Abstract:

    File contains utilities for parsing configuration files

--*/

use anyhow::Context;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Key Configuration
#[derive(Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct KeyConfig {
    /// Signing keys, in signature order
    pub sign_keys: Vec<String>,
}

impl KeyConfig {
    /// Signing key paths, relative to `config_dir` unless absolute
    pub fn sign_key_paths(&self, config_dir: &Path) -> Vec<PathBuf> {
        self.sign_keys
            .iter()
            .map(|key| config_dir.join(key))
            .collect()
    }
}

/// Load Key Configuration from file
pub(crate) fn load_key_config(path: &Path) -> anyhow::Result<KeyConfig> {
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read the config file {}", path.display()))?;

    let config: KeyConfig = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    Ok(config)
}
