//! Work counters for one umount computation.

use std::fmt;

/// Counts of the steps taken by one [`propagate_umount`](super::propagate_umount) run.
///
/// Every counter is bounded by a small multiple of the gathered set plus the
/// children scanned, which is what the complexity tests assert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UmountStats {
    /// Size of the caller's initial set.
    pub initial: usize,
    /// Mounts gathered as candidates.
    pub candidates: usize,
    /// Mounts produced by the propagation walker.
    pub walker_steps: usize,
    /// Walker fast-forwards over already handled peer runs.
    pub skipped_runs: usize,
    /// Walker steps whose mountpoint lookup found a mount.
    pub lookups: usize,
    /// Children inspected while trimming.
    pub children_scanned: usize,
    /// Marks set by upward trimming walks.
    pub ancestor_marks: usize,
    /// Candidates excluded to keep the set non-shifting.
    pub trimmed: usize,
    /// Childless unlocked candidates committed during trimming.
    pub committed_early: usize,
    /// Candidates promoted while keeping the set non-revealing.
    pub promoted: usize,
    /// Candidates discarded while keeping the set non-revealing.
    pub discarded: usize,
    /// Reparent directives emitted.
    pub reparented: usize,
}

impl UmountStats {
    /// Mounts added on top of the initial set.
    pub fn added(&self) -> usize {
        self.committed_early + self.promoted
    }

    /// Total elementary steps; linear in the size of the gathered set.
    pub fn work(&self) -> usize {
        self.walker_steps + self.lookups + self.children_scanned + self.ancestor_marks
    }
}

impl fmt::Display for UmountStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "initial={} candidates={} added={} trimmed={} discarded={} reparented={} work={}",
            self.initial,
            self.candidates,
            self.added(),
            self.trimmed,
            self.discarded,
            self.reparented,
            self.work()
        )
    }
}
