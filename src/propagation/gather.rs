//! Candidate gathering: `S = U ∪ Candidates`.
//!
//! A mount `c` outside `U` becomes a candidate when it sits at the mountpoint
//! of some `m ∈ U` under a mount that receives propagation from `m`'s parent.

use super::scratch::{MountFlags, Scratch};
use super::stats::UmountStats;
use super::walker;
use crate::topology::forest::Forest;
use crate::topology::mount_id::MountId;

/// Flag every mount of `S` and queue the ones outside `set` as candidates.
///
/// `set` members must already carry `UMOUNT`. Each lookup hit is flagged
/// once; hitting an already flagged mount means the rest of that peer run, and
/// everything receiving propagation from it, was covered by an earlier walk
/// with the same mountpoint, so the walk skips it.
pub(crate) fn gather_candidates(
    forest: &Forest,
    set: &[MountId],
    scratch: &mut Scratch,
    stats: &mut UmountStats,
) {
    for &m in set {
        if scratch.is_candidate(m) {
            continue;
        }
        scratch.set(m, MountFlags::CANDIDATE);
        let Some(parent) = forest.parent(m) else {
            continue;
        };
        let mountpoint = forest.mountpoint(m);

        let mut q = walker::first(forest, parent);
        while let Some(cur) = q {
            stats.walker_steps += 1;
            if let Some(child) = forest.lookup(cur, mountpoint) {
                stats.lookups += 1;
                if scratch.is_candidate(child) {
                    stats.skipped_runs += 1;
                    q = walker::skip_run(forest, cur, parent);
                    continue;
                }
                debug_assert!(
                    !forest.is_absolute_root(child),
                    "absolute root {child} gathered as umount candidate"
                );
                scratch.set(child, MountFlags::CANDIDATE);
                if !scratch.will_be_unmounted(child) {
                    log::trace!("umount candidate {child} (via {cur}, from {m})");
                    scratch.candidates.push_back(child);
                }
            }
            q = walker::next(forest, cur, parent);
        }
    }

    // members of U are committed, not candidates
    for &m in set {
        scratch.clear(m, MountFlags::CANDIDATE);
    }
    stats.candidates = scratch.candidates.len();
}
