//! Invariant checking for the forest and the umount engine.
//!
//! Checks run in debug builds, or in release builds compiled with the
//! `check-invariants` feature. A failed check is a programming error on the
//! caller's side (a corrupted forest, a set that breaks the umount contract),
//! so it panics instead of surfacing as a [`MountError`] at runtime.

use crate::mount_error::MountError;

/// `true` when invariant checks are compiled in.
pub const ENABLED: bool = cfg!(any(debug_assertions, feature = "check-invariants"));

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MountError>;

    /// Panic on the first broken invariant when checks are enabled.
    fn debug_assert_invariants(&self) {
        if ENABLED {
            if let Err(e) = self.validate_invariants() {
                panic!("[invariants] {}: {e}", std::any::type_name::<Self>());
            }
        }
    }
}

/// Run a fallible check and panic with `ctx` if it fails, only when invariant
/// checking is enabled. The checked expression is not evaluated otherwise.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        if $crate::debug_invariants::ENABLED {
            if let Err(e) = $expr {
                panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
            }
        }
    };
}
