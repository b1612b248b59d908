//! `MountId` and `Dentry`: strong, zero-cost handles for the mount forest
//!
//! Every mount in a [`Forest`](crate::topology::forest::Forest) lives in an
//! arena and is addressed by a `MountId`. The id wraps a nonzero `u32` so that
//! `Option<MountId>` costs nothing and 0 stays reserved as an invalid value.
//!
//! A `Dentry` is the opaque identity of a directory entry. Mountpoints and
//! mount roots are both dentries; the forest only ever compares them.

use crate::mount_error::MountError;
use std::{fmt, num::NonZeroU32};

/// Handle of a mount inside one forest.
///
/// Ids are dense: the n-th mount added to a forest gets id `n + 1`.
///
/// # Memory layout
/// `repr(transparent)` over `NonZeroU32`, so `Option<MountId>` is 4 bytes.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct MountId(NonZeroU32);

impl MountId {
    /// Creates a new `MountId` from a raw `u32` value.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::InvalidMountId`] if `raw == 0`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mount_propagation::topology::mount_id::MountId;
    /// let m = MountId::new(1).unwrap();
    /// assert_eq!(m.get(), 1);
    /// ```
    #[inline]
    pub fn new(raw: u32) -> Result<Self, MountError> {
        NonZeroU32::new(raw)
            .map(MountId)
            .ok_or(MountError::InvalidMountId)
    }

    /// Returns the inner `u32` value of this `MountId`.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Arena slot of this id.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Id for arena slot `index`. Callers keep `index < u32::MAX`.
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        MountId(NonZeroU32::MIN.saturating_add(index as u32))
    }
}

impl fmt::Debug for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MountId").field(&self.get()).finish()
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Opaque directory-entry identity.
///
/// A child mount is attached at a `Dentry` of its parent (its *mountpoint*),
/// and exposes one of its own dentries (its *root*). A child attached at the
/// parent's root dentry overmounts the parent.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Dentry(pub u64);

impl fmt::Display for Dentry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

impl From<u64> for Dentry {
    fn from(raw: u64) -> Self {
        Dentry(raw)
    }
}

/// Identifier of a peer group. Mounts with equal ids receive identical
/// propagation events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct GroupId(NonZeroU32);

impl GroupId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        GroupId(NonZeroU32::MIN.saturating_add(index as u32))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}
