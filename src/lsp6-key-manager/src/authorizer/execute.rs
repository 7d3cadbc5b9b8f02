use alloy_primitives::Address;
use lsp6_types::{allowed::decode_allowed_calls, Permissions};
use tracing::{trace, warn};

use crate::{
    account::Account,
    classifier::CallRequirement,
    errors::KeyManagerError,
    registry::Registry,
};

/// Check the call categories of `requirement`, then the caller's `AllowedCalls` if any category
/// is held without its SUPER bit.
pub fn verify_allowed_call<A: Account + ?Sized>(
    account: &A,
    from: Address,
    permissions: Permissions,
    requirement: &CallRequirement,
) -> Result<(), KeyManagerError> {
    let mut restricted = false;
    for category in requirement.categories.iter() {
        if category.super_variant().is_some_and(|s| permissions.has(s)) {
            continue;
        }
        if !permissions.has(category) {
            warn!(%from, permission = %category, "missing call permission");
            return Err(KeyManagerError::NotAuthorised {
                from,
                permission: category,
            });
        }
        restricted = true;
    }
    if !restricted {
        return Ok(());
    }

    let raw = Registry::new(account).get_allowed_calls(from);
    if raw.is_empty() {
        warn!(%from, "no AllowedCalls");
        return Err(KeyManagerError::NoCallsAllowed { from });
    }
    let allowed = decode_allowed_calls(&raw)
        .map_err(|_| KeyManagerError::InvalidEncodedAllowedCalls { value: raw.clone() })?;

    for entry in &allowed {
        if entry.is_zero_restriction() {
            return Err(KeyManagerError::InvalidWhitelistedCall { from });
        }
        trace!(?entry, "checking AllowedCalls entry");
        if entry.permits_call_types(requirement.call_types)
            && entry.matches_address(requirement.target)
            && entry.matches_selector(requirement.selector)
            && (entry.any_standard()
                || account.supports_interface(requirement.target, entry.standard))
        {
            return Ok(());
        }
    }

    warn!(%from, to = %requirement.target, selector = %requirement.selector, "call not allowed");
    Err(KeyManagerError::NotAllowedCall {
        from,
        to: requirement.target,
        selector: requirement.selector,
    })
}
