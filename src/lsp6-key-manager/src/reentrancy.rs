//! Reentrancy marker.
//!
//! Set while the key manager has handed control to the account for a non-`setData` payload, so a
//! call target that calls back in is seen as reentrant. The marker is released by a scope guard,
//! which also runs when the outer call fails or unwinds.

use core::cell::Cell;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }

    /// Enter a call. With `lock`, the marker is set for the lifetime of the returned scope
    /// (unless an outer scope already holds it).
    pub fn enter(&self, lock: bool) -> GuardScope<'_> {
        let reentrant = self.entered.get();
        let owns_lock = lock && !reentrant;
        if owns_lock {
            self.entered.set(true);
        }
        GuardScope {
            guard: self,
            reentrant,
            owns_lock,
        }
    }
}

/// One entry into the key manager.
#[must_use]
pub struct GuardScope<'a> {
    guard: &'a ReentrancyGuard,
    reentrant: bool,
    owns_lock: bool,
}

impl GuardScope<'_> {
    /// The marker was already set when this scope was entered.
    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        if self.owns_lock {
            self.guard.entered.set(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scopes_see_the_outer_lock() {
        let guard = ReentrancyGuard::new();
        {
            let outer = guard.enter(true);
            assert!(!outer.is_reentrant());
            {
                let inner = guard.enter(true);
                assert!(inner.is_reentrant());
            }
            assert!(guard.is_entered());
        }
        assert!(!guard.is_entered());
    }

    #[test]
    fn unlocked_scopes_leave_the_marker_alone() {
        let guard = ReentrancyGuard::new();
        let scope = guard.enter(false);
        assert!(!scope.is_reentrant());
        assert!(!guard.is_entered());
    }

    #[test]
    fn released_on_unwind() {
        let guard = ReentrancyGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = guard.enter(true);
            panic!("target blew up");
        }));
        assert!(result.is_err());
        assert!(!guard.is_entered());
    }
}
