//! Reparenting of overmounts that survive on top of unmounted mounts.
//!
//! A mount `o` that stays while the mount under it goes can only be a root
//! overmount (anything else would have made the set shifting). The whole stack
//! below `o` consists of root overmounts as well, so `o` slides down to where
//! the bottom of that stack is attached.

use super::scratch::Scratch;
use crate::topology::forest::Forest;
use crate::topology::mount_id::{Dentry, MountId};

/// Move `mount` to `mountpoint` of `new_parent`.
///
/// Applying a directive can leave two mounts at the same `(parent,
/// mountpoint)` for a moment: the bottom of the unmounted stack is still
/// attached there. The caller resolves this by detaching the unmounted set
/// right away; the conflicting mount is always part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Reparent {
    pub mount: MountId,
    pub new_parent: MountId,
    pub mountpoint: Dentry,
}

/// Where `over` lands once every committed mount under it is gone.
///
/// Returns `None` only if the stack bottoms out in an absolute root, which a
/// valid umount set never allows.
pub(crate) fn reparent_target(forest: &Forest, scratch: &Scratch, over: MountId) -> Option<Reparent> {
    let mut p = over;
    loop {
        let mountpoint = forest.mountpoint(p);
        p = forest.parent(p)?;
        if !scratch.will_be_unmounted(p) {
            return Some(Reparent {
                mount: over,
                new_parent: p,
                mountpoint,
            });
        }
    }
}

/// Directives for every surviving overmount of a committed mount.
pub(crate) fn collect_reparents(
    forest: &Forest,
    scratch: &Scratch,
    set: &[MountId],
) -> Vec<Reparent> {
    let mut out = Vec::new();
    for &m in set {
        let Some(over) = forest.overmount(m) else {
            continue;
        };
        if scratch.will_be_unmounted(over) {
            continue;
        }
        match reparent_target(forest, scratch, over) {
            Some(r) => {
                log::trace!(
                    "reparent {} onto {} at {}",
                    r.mount,
                    r.new_parent,
                    r.mountpoint
                );
                out.push(r);
            }
            None => debug_assert!(false, "overmount {over} sits on an unmounted absolute root"),
        }
    }
    out
}
