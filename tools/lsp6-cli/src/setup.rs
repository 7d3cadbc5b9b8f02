//! Controller setup files.
//!
//! ```json
//! {
//!   "controller": "0x…",
//!   "permissions": ["CALL", "TRANSFERVALUE"],
//!   "allowedCalls": [
//!     { "callTypes": ["CALL", "VALUE"], "address": "0x…", "standard": "0xffffffff", "selector": "0xa9059cbb" }
//!   ],
//!   "allowedDataKeys": ["0xbeef"],
//!   "index": 1
//! }
//! ```

use std::{fs, path::Path};

use alloy_primitives::{Address, Bytes, FixedBytes};
use anyhow::{anyhow, Context, Result};
use lsp6_encoder::ControllerSetup;
use lsp6_key_manager::{MemoryAccount, Registry};
use lsp6_types::{
    allowed::{WILDCARD_ADDRESS, WILDCARD_SELECTOR, WILDCARD_STANDARD},
    AllowedCall, CallTypes, Permission, Permissions,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupFile {
    pub controller: Address,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub allowed_calls: Vec<AllowedCallFile>,
    #[serde(default)]
    pub allowed_data_keys: Vec<Bytes>,
    #[serde(default)]
    pub index: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedCallFile {
    pub call_types: Vec<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub standard: Option<FixedBytes<4>>,
    #[serde(default)]
    pub selector: Option<FixedBytes<4>>,
}

impl SetupFile {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing setup JSON in {}", path.display()))
    }

    pub fn to_controller_setup(&self) -> Result<ControllerSetup> {
        Ok(ControllerSetup {
            controller: self.controller,
            permissions: parse_permissions(&self.permissions)?,
            allowed_calls: self
                .allowed_calls
                .iter()
                .map(AllowedCallFile::to_allowed_call)
                .collect::<Result<_>>()?,
            allowed_data_keys: self.allowed_data_keys.iter().map(|k| k.to_vec()).collect(),
            index: u128::from(self.index),
        })
    }
}

impl AllowedCallFile {
    /// Missing address, standard or selector fields mean "any".
    fn to_allowed_call(&self) -> Result<AllowedCall> {
        let mut call_types = CallTypes::NONE;
        for name in &self.call_types {
            call_types = call_types | parse_call_type(name)?;
        }
        Ok(AllowedCall {
            call_types,
            address: self.address.unwrap_or(WILDCARD_ADDRESS),
            standard: self.standard.unwrap_or(WILDCARD_STANDARD),
            selector: self.selector.unwrap_or(WILDCARD_SELECTOR),
        })
    }
}

pub fn parse_permissions(names: &[String]) -> Result<Permissions> {
    let mut permissions = Permissions::NONE;
    for name in names {
        if name == "ALL_PERMISSIONS" {
            permissions = permissions | Permissions::ALL_PERMISSIONS;
            continue;
        }
        let permission: Permission = name
            .parse()
            .with_context(|| format!("in permission list {names:?}"))?;
        permissions = permissions | permission;
    }
    Ok(permissions)
}

fn parse_call_type(name: &str) -> Result<CallTypes> {
    match name.to_ascii_uppercase().as_str() {
        "VALUE" => Ok(CallTypes::VALUE),
        "CALL" => Ok(CallTypes::CALL),
        "STATICCALL" => Ok(CallTypes::STATICCALL),
        "DELEGATECALL" => Ok(CallTypes::DELEGATECALL),
        other => Err(anyhow!("unknown call type `{other}`")),
    }
}

/// Write `setup` straight into the account's storage, as a deployment script would.
pub fn seed_account(account: &MemoryAccount, setup: &ControllerSetup) -> Result<()> {
    let registry = Registry::new(account);
    registry.set_permissions(setup.controller, setup.permissions);
    if !setup.allowed_calls.is_empty() {
        registry.set_allowed_calls(setup.controller, &setup.allowed_calls);
    }
    if !setup.allowed_data_keys.is_empty() {
        registry
            .set_allowed_data_keys(setup.controller, &setup.allowed_data_keys)
            .with_context(|| format!("invalid allowed data keys for {}", setup.controller))?;
    }
    Ok(())
}
