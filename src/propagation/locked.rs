//! Non-revealing reduction.
//!
//! A locked mount hides what lies under it in its parent. It may only go away
//! together with that parent. Every remaining candidate is settled here: its
//! chain of candidate ancestors is either promoted into `U` or discarded.

use super::scratch::Scratch;
use super::stats::UmountStats;
use super::trim::umount_one;
use crate::topology::forest::Forest;
use crate::topology::mount_id::MountId;

/// Settle `m` and every candidate above it.
///
/// Walking up from `m`, the chain ends at the first mount `top` that is not
/// a candidate. The longest prefix of the chain (from `m` upward) that can go
/// is promoted:
/// - `top` is committed: the whole chain goes;
/// - otherwise everything up to the topmost unlocked mount goes;
/// - an all-locked chain under a surviving `top` is discarded entirely.
pub(crate) fn handle_locked(
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

    let mut cutoff = Some(m);
    let mut chain = 0usize;
    let mut p = Some(m);
    while let Some(cur) = p.filter(|&c| scratch.is_candidate(c)) {
        scratch.remove_candidate(cur);
        chain += 1;
        if !forest.is_locked(cur) {
            cutoff = forest.parent(cur);
        }
        p = forest.parent(cur);
    }
    debug_assert!(p.is_some(), "umount candidate chain above {m} reached an absolute root");
    if let Some(top) = p
        && scratch.will_be_unmounted(top)
    {
        cutoff = Some(top);
    }

    let mut promoted = 0usize;
    let mut cur = Some(m);
    while let Some(c) = cur {
        if Some(c) == cutoff || promoted == chain {
            break;
        }
        log::trace!("promote {c}");
        umount_one(scratch, committed, c);
        promoted += 1;
        cur = forest.parent(c);
    }
    if promoted < chain {
        log::trace!("discard {} locked mount(s) above {m}", chain - promoted);
    }
    stats.promoted += promoted;
    stats.discarded += chain - promoted;
}

/// Settle candidates until the worklist is empty.
pub(crate) fn handle_all_locked(
    forest: &Forest,
    scratch: &mut Scratch,
    committed: &mut Vec<MountId>,
    stats: &mut UmountStats,
) {
    while let Some(m) = scratch.candidates.front() {
        handle_locked(forest, scratch, committed, stats, m);
    }
}
