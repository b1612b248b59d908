//! Propagation walker: the order in which events on a mount reach the mounts
//! that receive propagation from it.
//!
//! For an origin `p` the walk visits every peer of `p` and, depth first, every
//! mount below them in the master/slave forest. From any mount it first goes
//! down into its slave list, then forward along slave lists and peer rings,
//! climbing back to the master whenever a slave list runs out. `p` itself is
//! never produced.
//!
//! All functions are pure over `&Forest`; the cursor is the last mount
//! returned, held by the caller, so a walk can be paused, restarted or
//! fast-forwarded with [`skip_run`].

use crate::topology::forest::Forest;
use crate::topology::mount_id::MountId;

/// First mount after `origin` in propagation order.
#[inline]
pub fn first(forest: &Forest, origin: MountId) -> Option<MountId> {
    next(forest, origin, origin)
}

/// Mount following `m` in the propagation order rooted at `origin`.
pub fn next(forest: &Forest, m: MountId, origin: MountId) -> Option<MountId> {
    if let Some(slave) = forest.first_slave(m) {
        return Some(slave);
    }
    forward(forest, m, origin)
}

/// Advance past `m` and the peers of `m` that follow it, without entering
/// any of their slave lists. The result is the first mount that is not a peer
/// of `m`, or `None` once the walk is exhausted.
pub fn skip_run(forest: &Forest, m: MountId, origin: MountId) -> Option<MountId> {
    let mut p = forward(forest, m, origin);
    while let Some(q) = p {
        if !forest.are_peers(m, q) {
            break;
        }
        p = forward(forest, q, origin);
    }
    p
}

/// Step forward from `m` without descending into its slaves.
fn forward(forest: &Forest, mut m: MountId, origin: MountId) -> Option<MountId> {
    let origin_master = forest.master(origin);
    loop {
        let master = forest.master(m);
        if master == origin_master {
            let next = forest.next_peer(m);
            return (next != origin).then_some(next);
        }
        if let Some(next) = forest.next_slave(m) {
            return Some(next);
        }
        // end of a slave list: resume after the master
        m = master?;
    }
}

/// Lazy iterator over the propagation order rooted at `origin`.
///
/// Besides plain iteration it supports [`Propagation::skip_run`], which drops
/// the rest of the current peer run and its slaves from the walk.
#[derive(Debug, Clone)]
pub struct Propagation<'a> {
    forest: &'a Forest,
    origin: MountId,
    state: Cursor,
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Start,
    /// Last mount handed out.
    At(MountId),
    /// Next mount to hand out, already computed by a skip.
    Pending(MountId),
    Done,
}

impl<'a> Propagation<'a> {
    pub fn new(forest: &'a Forest, origin: MountId) -> Self {
        Self {
            forest,
            origin,
            state: Cursor::Start,
        }
    }

    /// Skip what remains of the peer run of the mount returned last, together
    /// with everything receiving propagation from that run.
    pub fn skip_run(&mut self) {
        if let Cursor::At(m) = self.state {
            self.state = match skip_run(self.forest, m, self.origin) {
                Some(after) => Cursor::Pending(after),
                None => Cursor::Done,
            };
        }
    }
}

impl Iterator for Propagation<'_> {
    type Item = MountId;

    fn next(&mut self) -> Option<MountId> {
        let step = match self.state {
            Cursor::Start => first(self.forest, self.origin),
            Cursor::At(m) => next(self.forest, m, self.origin),
            Cursor::Pending(m) => Some(m),
            Cursor::Done => None,
        };
        self.state = step.map_or(Cursor::Done, Cursor::At);
        step
    }
}

/// Convenience wrapper for [`Propagation::new`].
pub fn propagation(forest: &Forest, origin: MountId) -> Propagation<'_> {
    Propagation::new(forest, origin)
}
