//! Top-level module for the mount forest.
//!
//! This module provides the data the umount computation runs over:
//! - [`mount_id`]: strong handles for mounts, dentries and peer groups
//! - [`forest`]: the arena forest with tree and propagation relations
//! - [`validation`]: set predicates (closed, non-revealing, non-shifting)
//! - [`desc`]: serde descriptions that build a forest by name

pub mod desc;
pub mod forest;
pub mod mount_id;
pub mod validation;

pub use forest::Forest;
pub use mount_id::{Dentry, GroupId, MountId};
