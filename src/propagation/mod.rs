//! Umount propagation.
//!
//! Given an initial set `U` of mounts to unmount (closed, non-revealing, with
//! an unlocked root), [`propagate_umount`] adds every mount that receives the
//! umount through propagation and can go without
//! - *shifting*: something that stays mounted living strictly inside a
//!   mount that goes, or
//! - *revealing*: a locked mount going while its parent stays.
//!
//! The result is the largest such extension of `U`. It is computed in four
//! passes, each linear in the size of the gathered set:
//!
//! 1. [`gather`]: collect candidates through the propagation walker;
//! 2. [`trim`]: drop candidates until the set is non-shifting;
//! 3. [`locked`]: promote or discard what is left until it is non-revealing;
//! 4. [`reparent`]: find where surviving overmounts go.
//!
//! The forest is only read. Transient flags live in a [`Propagator`]'s side
//! table, which can be reused across calls.

pub mod gather;
pub mod locked;
pub mod reparent;
pub(crate) mod scratch;
pub mod stats;
pub mod trim;
pub mod walker;

pub use reparent::Reparent;
pub use stats::UmountStats;
pub use walker::{Propagation, propagation};

use crate::debug_invariants::DebugInvariants;
use crate::mount_error::MountError;
use crate::topology::forest::Forest;
use crate::topology::mount_id::MountId;
use crate::topology::validation::{
    MountSet, check_caller_set, check_non_revealing, check_non_shifting, member_set,
};
use scratch::{MountFlags, Scratch};

/// Initial set of mounts to unmount.
///
/// Usually the whole subtree of the umount target, see
/// [`UmountSet::from_subtree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmountSet {
    mounts: Vec<MountId>,
}

impl UmountSet {
    /// The subtree rooted at `target`.
    ///
    /// # Errors
    /// [`MountError::LockedRoot`] if `target` is locked. Every other member
    /// has its parent in the set, so the subtree is non-revealing otherwise.
    pub fn from_subtree(forest: &Forest, target: MountId) -> Result<Self, MountError> {
        if !forest.contains(target) {
            return Err(MountError::UnknownMount(target));
        }
        if forest.is_locked(target) {
            return Err(MountError::LockedRoot(target));
        }
        Ok(Self {
            mounts: forest.subtree(target),
        })
    }

    /// A caller-assembled set, validated against the umount contract.
    pub fn try_new<I>(forest: &Forest, mounts: I) -> Result<Self, MountError>
    where
        I: IntoIterator<Item = MountId>,
    {
        let mounts: Vec<MountId> = mounts.into_iter().collect();
        if let Err(e) = check_caller_set(forest, &mounts) {
            log::warn!("rejecting umount set of {} mount(s): {e}", mounts.len());
            return Err(e);
        }
        Ok(Self { mounts })
    }

    /// Trust the caller. Violations trip invariant checks when enabled.
    pub fn new_unchecked(mounts: Vec<MountId>) -> Self {
        Self { mounts }
    }

    #[inline]
    pub fn as_slice(&self) -> &[MountId] {
        &self.mounts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MountId> + '_ {
        self.mounts.iter().copied()
    }
}

/// Result of [`propagate_umount`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UmountPlan {
    /// The augmented set: the initial members first, then the added mounts
    /// in the order they were committed.
    pub set: Vec<MountId>,
    /// Overmounts that stay and must be moved before the set is detached.
    pub reparent: Vec<Reparent>,
    pub stats: UmountStats,
    initial: usize,
}

impl UmountPlan {
    /// Mounts added on top of the initial set.
    pub fn added(&self) -> &[MountId] {
        &self.set[self.initial..]
    }

    /// Linear scan; build a [`MountSet`] via [`UmountPlan::members`] for
    /// repeated queries.
    pub fn contains(&self, m: MountId) -> bool {
        self.set.contains(&m)
    }

    pub fn members(&self) -> MountSet {
        member_set(&self.set)
    }

    /// Check the plan against `forest`: non-shifting, non-revealing, and
    /// exactly one directive per surviving overmount, each naming the place
    /// the stack under it is attached.
    pub fn validate(&self, forest: &Forest) -> Result<(), MountError> {
        let members = self.members();
        check_non_shifting(forest, &members)?;
        check_non_revealing(forest, &members)?;

        let mut expected = hashbrown::HashSet::new();
        for &m in &self.set {
            let Some(over) = forest.overmount(m) else {
                continue;
            };
            if members.contains(&over) {
                continue;
            }
            let mut p = over;
            let mut mountpoint = forest.mountpoint(p);
            while let Some(parent) = forest.parent(p) {
                p = parent;
                if !members.contains(&p) {
                    break;
                }
                mountpoint = forest.mountpoint(p);
            }
            expected.insert(Reparent {
                mount: over,
                new_parent: p,
                mountpoint,
            });
        }
        for r in &self.reparent {
            if !expected.remove(r) {
                return Err(MountError::BadReparent {
                    mount: r.mount,
                    reason: "does not match the stack under it",
                });
            }
        }
        if let Some(e) = expected.iter().next() {
            return Err(MountError::BadReparent {
                mount: e.mount,
                reason: "surviving overmount without directive",
            });
        }
        Ok(())
    }
}

/// Reusable umount engine. Keeps its side table between calls.
#[derive(Debug, Default)]
pub struct Propagator {
    scratch: Scratch,
}

impl Propagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend `set` to everything that can be unmounted along with it.
    ///
    /// See the [module documentation](self) for the passes.
    ///
    /// # Panics
    /// With invariant checks enabled, panics if `set` breaks the umount
    /// contract or the forest is inconsistent.
    pub fn propagate_umount(&mut self, forest: &Forest, set: &UmountSet) -> UmountPlan {
        crate::debug_invariants!(
            check_caller_set(forest, set.as_slice()),
            "propagate_umount: bad initial set"
        );
        forest.debug_assert_invariants();

        let scratch = &mut self.scratch;
        scratch.prepare(forest.len());
        let mut stats = UmountStats {
            initial: set.len(),
            ..UmountStats::default()
        };

        for m in set.iter() {
            scratch.set(m, MountFlags::UMOUNT);
        }
        gather::gather_candidates(forest, set.as_slice(), scratch, &mut stats);
        log::debug!(
            "umount of {} mount(s): {} candidate(s) after {} walker step(s)",
            set.len(),
            stats.candidates,
            stats.walker_steps
        );

        let mut committed = Vec::new();
        trim::trim_all(forest, scratch, &mut committed, &mut stats);
        log::debug!(
            "non-shifting: trimmed {}, committed {}, {} left",
            stats.trimmed,
            stats.committed_early,
            scratch.candidates.len()
        );

        locked::handle_all_locked(forest, scratch, &mut committed, &mut stats);
        log::debug!(
            "non-revealing: promoted {}, discarded {}",
            stats.promoted,
            stats.discarded
        );

        let mut full = Vec::with_capacity(set.len() + committed.len());
        full.extend(set.iter());
        full.extend(committed);
        let reparent = reparent::collect_reparents(forest, scratch, &full);
        stats.reparented = reparent.len();
        scratch.reset();

        log::debug!("umount plan: {stats}");
        let plan = UmountPlan {
            set: full,
            reparent,
            stats,
            initial: set.len(),
        };
        crate::debug_invariants!(plan.validate(forest), "propagate_umount: bad result");
        plan
    }
}

/// One-shot [`Propagator::propagate_umount`].
pub fn propagate_umount(forest: &Forest, set: &UmountSet) -> UmountPlan {
    Propagator::new().propagate_umount(forest, set)
}
