//! MountError: unified error type for mount-propagation public APIs
//!
//! The propagation algorithm itself cannot fail once its preconditions hold.
//! Everything around it (building a forest, assembling an initial umount set,
//! decoding a forest description) reports failures through this type.

use crate::topology::mount_id::{Dentry, MountId};
use thiserror::Error;

/// Unified error type for forest construction and umount-set validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MountError {
    /// Attempted to construct a MountId with a zero value (invalid).
    #[error("MountId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidMountId,
    /// The id does not name a mount of this forest.
    #[error("unknown mount `{0}`")]
    UnknownMount(MountId),
    /// The forest cannot address more mounts.
    #[error("forest is full: cannot allocate more than {0} mounts")]
    ForestFull(usize),
    /// Something is already attached at this mountpoint of `parent`.
    #[error("mountpoint {mountpoint} of mount `{parent}` is busy (occupied by `{occupant}`)")]
    MountpointBusy {
        parent: MountId,
        mountpoint: Dentry,
        occupant: MountId,
    },
    /// Attaching `master` as master of `mount` would make propagation cyclic.
    #[error("propagation cycle: `{master}` already receives propagation from `{mount}`")]
    PropagationCycle { mount: MountId, master: MountId },
    /// The peer group of this mount already has a master.
    #[error("mount `{0}` is already a slave")]
    AlreadySlave(MountId),
    /// The mount already belongs to a peer group.
    #[error("mount `{0}` is already shared")]
    AlreadyShared(MountId),
    /// A child of a set member is missing from the set.
    #[error("umount set is not closed: child `{child}` of `{mount}` is missing")]
    NotClosed { mount: MountId, child: MountId },
    /// A locked set member has a parent outside the set.
    #[error("umount set is revealing: locked mount `{mount}` would expose its parent")]
    Revealing { mount: MountId },
    /// A set member would drag a non-overmounting descendant along with it.
    #[error("umount set is shifting: `{child}` under `{mount}` would be shifted")]
    Shifting { mount: MountId, child: MountId },
    /// The root of the umount set is locked.
    #[error("cannot unmount locked mount `{0}`")]
    LockedRoot(MountId),
    /// An umount set must contain at least one mount.
    #[error("umount set is empty")]
    EmptySet,
    /// The same mount was listed twice in an umount set.
    #[error("mount `{0}` listed twice in umount set")]
    DuplicateInSet(MountId),
    /// A reparent directive does not match the stack it was emitted for.
    #[error("bad reparent directive for `{mount}`: {reason}")]
    BadReparent { mount: MountId, reason: &'static str },
    /// Parent/child bookkeeping disagrees with the mountpoint index.
    #[error("forest corrupted: child `{child}` of `{parent}` missing from mountpoint index")]
    ChildIndexMismatch { parent: MountId, child: MountId },
    /// Peer ring or group bookkeeping is inconsistent.
    #[error("forest corrupted: peer group mismatch between `{mount}` and `{peer}`")]
    PeerGroupMismatch { mount: MountId, peer: MountId },
    /// Master/slave bookkeeping is inconsistent.
    #[error("forest corrupted: slave list of `{master}` is inconsistent at `{slave}`")]
    SlaveListMismatch { master: MountId, slave: MountId },
    /// A forest description referenced a name it never defined.
    #[error("forest description: unknown mount name `{0}`")]
    UnknownName(String),
    /// A forest description defined the same name twice.
    #[error("forest description: duplicate mount name `{0}`")]
    DuplicateName(String),
}
