//! Non-shifting reduction.
//!
//! A candidate is *forbidden* when something that stays mounted lives strictly
//! inside it, i.e. not merely stacked on its root. Unmounting a forbidden
//! mount would shift that survivor to a different place in the tree, so it is
//! excluded, and its exclusion may in turn forbid its ancestors.

use super::scratch::{MountFlags, Scratch};
use super::stats::UmountStats;
use crate::topology::forest::Forest;
use crate::topology::mount_id::MountId;

/// Move `m` into the committed set and hide it from its parent's children.
pub(crate) fn umount_one(scratch: &mut Scratch, committed: &mut Vec<MountId>, m: MountId) {
    scratch.set(m, MountFlags::UMOUNT);
    committed.push(m);
}

/// Some child of `m` stays mounted. Strip every candidate ancestor reached
/// through a link that is not a root overmount.
///
/// The walk stops at the first mount that is not a candidate, or at a mount
/// marked by an earlier walk: the decisions above it only depend on the links
/// and were taken already.
fn trim_ancestors(forest: &Forest, scratch: &mut Scratch, stats: &mut UmountStats, mut m: MountId) {
    while let Some(p) = forest.parent(m) {
        if !scratch.is_candidate(p) {
            break;
        }
        if scratch.has(m, MountFlags::MARKED) {
            return;
        }
        scratch.set(m, MountFlags::MARKED);
        stats.ancestor_marks += 1;
        if forest.overmount(p) != Some(m) {
            log::trace!("trim {p}: {m} does not overmount it");
            scratch.clear(p, MountFlags::CANDIDATE);
            stats.trimmed += 1;
        }
        m = p;
    }
}

/// Exclude `m` if it is forbidden and strip the ancestors it forbids.
///
/// Only `m` itself is taken off the worklist. Ancestors stripped by
/// [`trim_ancestors`] stay linked, without the candidate flag, until the
/// worklist reaches them. A childless unlocked candidate is committed at once.
pub(crate) fn trim_one(
    forest: &Forest,
    scratch: &mut Scratch,
    committed: &mut Vec<MountId>,
    stats: &mut UmountStats,
    m: MountId,
) {
    if !scratch.is_candidate(m) {
        scratch.remove_candidate(m);
        return;
    }

    let overmount = forest.overmount(m);
    let mut found = false;
    let mut remove_this = false;
    let mut has_children = false;
    for &n in forest.children(m) {
        if scratch.will_be_unmounted(n) {
            continue;
        }
        stats.children_scanned += 1;
        has_children = true;
        if !scratch.is_candidate(n) {
            found = true;
            if Some(n) != overmount {
                remove_this = true;
                break;
            }
        }
    }

    let mut umount_this = false;
    if found {
        trim_ancestors(forest, scratch, stats, m);
    } else if !forest.is_locked(m) && !has_children {
        remove_this = true;
        umount_this = true;
    }

    if remove_this {
        scratch.remove_candidate(m);
        if umount_this {
            log::trace!("commit {m}: childless and unlocked");
            stats.committed_early += 1;
            umount_one(scratch, committed, m);
        } else {
            log::trace!("trim {m}: a survivor lives inside it");
            stats.trimmed += 1;
        }
    }
}

/// Run [`trim_one`] over the whole worklist once.
pub(crate) fn trim_all(
    forest: &Forest,
    scratch: &mut Scratch,
    committed: &mut Vec<MountId>,
    stats: &mut UmountStats,
) {
    let mut cur = scratch.candidates.front();
    while let Some(m) = cur {
        let next = scratch.candidates.next(m);
        trim_one(forest, scratch, committed, stats, m);
        cur = next;
    }
}
