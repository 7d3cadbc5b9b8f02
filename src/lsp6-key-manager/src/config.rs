//! Key manager deployment parameters.

use std::{fs, path::Path};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid key manager config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the key manager lives and which chain it signs for.
///
/// `address` is the EIP-191 "intended validator" of relay signatures, `chain_id` is bound into
/// every signed relay message, so a signature is only valid for one key manager on one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyManagerConfig {
    pub address: Address,
    pub chain_id: u64,
}

impl KeyManagerConfig {
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self { address, chain_id }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}
