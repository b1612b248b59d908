//! # mount-propagation
//!
//! mount-propagation computes how an umount spreads through a forest of mounts
//! connected by propagation (shared and slave mounts). Starting from the set of
//! mounts a caller wants gone, it finds every mount that receives the umount
//! and can be taken down without moving anything that stays mounted and
//! without exposing what a locked mount hides, in time linear in the number of
//! mounts it looks at.
//!
//! ## Features
//! - An arena [`Forest`](topology::forest::Forest) of mounts with peer groups
//!   and master/slave propagation
//! - A restartable propagation walker with peer-run skipping
//! - The four-pass umount computation: gather, non-shifting trim,
//!   non-revealing promotion, reparenting of surviving overmounts
//! - Serde forest descriptions for fixtures and tooling
//! - Set predicates and invariant checks (enable `check-invariants` to keep
//!   them in release builds)
//!
//! ## Usage
//! ```rust
//! use mount_propagation::prelude::*;
//!
//! let mut forest = Forest::new();
//! let root = forest.add_root(1).unwrap();
//! let a = forest.attach(root, 10, 100).unwrap();
//! let b = forest.attach(root, 11, 100).unwrap();
//! forest.add_peer(a, b).unwrap();
//! let m0 = forest.attach(a, 20, 200).unwrap();
//! let m1 = forest.attach(b, 20, 200).unwrap();
//!
//! let set = UmountSet::from_subtree(&forest, m0).unwrap();
//! let plan = propagate_umount(&forest, &set);
//! assert_eq!(plan.set, vec![m0, m1]);
//! assert!(plan.reparent.is_empty());
//! ```
//!
//! ## Caller contract
//! The forest is only read. Applying the plan (moving the overmounts named in
//! [`UmountPlan::reparent`](propagation::UmountPlan) and detaching the set) is
//! left to the caller, who must serialise all forest mutation around the call
//! and detach the set right after applying the directives.

pub mod debug_invariants;
pub mod mount_error;
pub mod propagation;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mount_error::MountError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mount_error::MountError;
    pub use crate::propagation::{
        Propagation, Propagator, Reparent, UmountPlan, UmountSet, UmountStats, propagate_umount,
        propagation,
    };
    pub use crate::topology::desc::{ForestDesc, MountDesc, NamedForest, SlaveDesc};
    pub use crate::topology::forest::Forest;
    pub use crate::topology::mount_id::{Dentry, GroupId, MountId};
    pub use crate::topology::validation::MountSet;
}
