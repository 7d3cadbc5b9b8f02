//! Authorization engine.
//!
//! Checks a caller's stored permission bits (and, where the caller only holds the plain bit of a
//! category, its allow-list) against the requirements of each intent. Nothing here writes state;
//! the key manager forwards the payload only once every intent has been authorized.

mod execute;
mod set_data;

use alloy_primitives::{Address, U256};
use lsp6_types::{Permission, Permissions};
use tracing::{debug, warn};

use crate::{
    account::Account,
    classifier::{classify, Intent, Requirement},
    decoder::AccountCall,
    errors::KeyManagerError,
};

pub use execute::verify_allowed_call;
pub use set_data::verify_allowed_data_key;

/// Fail with `NotAuthorised` naming the lowest bit of `required` that `held` lacks.
pub fn require_permissions(
    from: Address,
    held: Permissions,
    required: Permissions,
) -> Result<(), KeyManagerError> {
    match held.first_missing(required) {
        None => Ok(()),
        Some(permission) => {
            warn!(%from, %permission, "missing permission");
            Err(KeyManagerError::NotAuthorised { from, permission })
        }
    }
}

/// Shorthand for a single bit.
pub fn require_permission(
    from: Address,
    held: Permissions,
    permission: Permission,
) -> Result<(), KeyManagerError> {
    require_permissions(from, held, permission.into())
}

/// Authorizes intents against the records stored in `account`.
pub struct Authorizer<'a, A: Account + ?Sized> {
    account: &'a A,
}

impl<'a, A: Account + ?Sized> Authorizer<'a, A> {
    pub fn new(account: &'a A) -> Self {
        Self { account }
    }

    /// Authorize every intent of `call`. Batch payloads report the failing item's position.
    pub fn authorize_call(
        &self,
        from: Address,
        permissions: Permissions,
        call: &AccountCall,
        msg_value: U256,
    ) -> Result<(), KeyManagerError> {
        let intents = classify(call, msg_value)?;
        if call.is_batch() {
            return self.authorize_batch(from, permissions, &intents);
        }
        for intent in &intents {
            self.authorize(from, permissions, intent)?;
        }
        Ok(())
    }

    /// Authorize `intents` in order, stopping at the first denial.
    pub fn authorize_batch(
        &self,
        from: Address,
        permissions: Permissions,
        intents: &[Intent],
    ) -> Result<(), KeyManagerError> {
        for (index, intent) in intents.iter().enumerate() {
            self.authorize(from, permissions, intent)
                .map_err(|err| err.at_batch_index(index))?;
        }
        Ok(())
    }

    pub fn authorize(
        &self,
        from: Address,
        permissions: Permissions,
        intent: &Intent,
    ) -> Result<(), KeyManagerError> {
        match intent.requirement(self.account)? {
            Requirement::Permissions(required) => require_permissions(from, permissions, required)?,
            Requirement::DataKey { key } => {
                verify_allowed_data_key(self.account, from, permissions, &key)?
            }
            Requirement::Call(requirement) => {
                verify_allowed_call(self.account, from, permissions, &requirement)?
            }
        }
        debug!(%from, ?intent, "intent authorized");
        Ok(())
    }
}
