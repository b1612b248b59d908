//! Arena-allocated mount forest with propagation groups.
//!
//! [`Forest`] stores every mount in a `Vec` and links them by [`MountId`]
//! instead of pointers, so parent back-references and the circular peer rings
//! never form ownership cycles.
//!
//! Two relations live side by side:
//! - the *tree*: `parent`, `mountpoint` and an ordered child list. At most one
//!   child may sit at a given `(parent, mountpoint)`; a stack of mounts is a
//!   chain where each mount is attached at the root dentry of the one below.
//! - the *propagation* relation: peer groups (a circular ring plus a
//!   [`GroupId`]) and master/slave links. All members of a peer group share
//!   their master and occupy a contiguous run of that master's slave list.
//!
//! The forest only grows; detaching mounts is the job of whoever applies an
//! [`UmountPlan`](crate::propagation::UmountPlan).

use crate::debug_invariants::DebugInvariants;
use crate::mount_error::MountError;
use crate::topology::mount_id::{Dentry, GroupId, MountId};
use hashbrown::HashMap;

#[derive(Debug, Clone)]
struct MountNode {
    parent: Option<MountId>,
    mountpoint: Dentry,
    root: Dentry,
    locked: bool,
    children: Vec<MountId>,
    group: Option<GroupId>,
    peer_next: MountId,
    peer_prev: MountId,
    master: Option<MountId>,
    slaves: Vec<MountId>,
    /// Position inside `master.slaves`; meaningless without a master.
    slave_pos: usize,
}

/// A forest of mounts connected by tree and propagation relations.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    mounts: Vec<MountNode>,
    /// `(parent, mountpoint) -> child` lookup.
    index: HashMap<(MountId, Dentry), MountId>,
    groups: usize,
}

impl Forest {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mounts in the forest.
    #[inline]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// All mount ids, in creation order.
    pub fn mounts(&self) -> impl Iterator<Item = MountId> + '_ {
        (0..self.mounts.len()).map(MountId::from_index)
    }

    /// Returns `true` if `m` names a mount of this forest.
    #[inline]
    pub fn contains(&self, m: MountId) -> bool {
        m.index() < self.mounts.len()
    }

    fn check(&self, m: MountId) -> Result<(), MountError> {
        if self.contains(m) {
            Ok(())
        } else {
            Err(MountError::UnknownMount(m))
        }
    }

    fn push(
        &mut self,
        parent: Option<MountId>,
        mountpoint: Dentry,
        root: Dentry,
    ) -> Result<MountId, MountError> {
        let idx = self.mounts.len();
        if idx >= u32::MAX as usize {
            return Err(MountError::ForestFull(idx));
        }
        let id = MountId::from_index(idx);
        self.mounts.push(MountNode {
            parent,
            mountpoint,
            root,
            locked: false,
            children: Vec::new(),
            group: None,
            peer_next: id,
            peer_prev: id,
            master: None,
            slaves: Vec::new(),
            slave_pos: 0,
        });
        Ok(id)
    }

    #[inline]
    fn node(&self, m: MountId) -> &MountNode {
        &self.mounts[m.index()]
    }

    #[inline]
    fn node_mut(&mut self, m: MountId) -> &mut MountNode {
        &mut self.mounts[m.index()]
    }

    // === Construction ===

    /// Adds an absolute root (a mount with no parent) exposing `root`.
    pub fn add_root(&mut self, root: impl Into<Dentry>) -> Result<MountId, MountError> {
        let root = root.into();
        self.push(None, root, root)
    }

    /// Attaches a new mount exposing `root` at `mountpoint` of `parent`.
    ///
    /// Attaching at `parent`'s own root dentry overmounts `parent`.
    ///
    /// # Errors
    /// [`MountError::MountpointBusy`] if something already sits there.
    pub fn attach(
        &mut self,
        parent: MountId,
        mountpoint: impl Into<Dentry>,
        root: impl Into<Dentry>,
    ) -> Result<MountId, MountError> {
        self.check(parent)?;
        let mountpoint = mountpoint.into();
        if let Some(&occupant) = self.index.get(&(parent, mountpoint)) {
            return Err(MountError::MountpointBusy {
                parent,
                mountpoint,
                occupant,
            });
        }
        let id = self.push(Some(parent), mountpoint, root.into())?;
        self.node_mut(parent).children.push(id);
        self.index.insert((parent, mountpoint), id);
        Ok(id)
    }

    /// Attaches a new mount on top of `lower`, i.e. at `lower`'s root dentry.
    pub fn overmount_with(
        &mut self,
        lower: MountId,
        root: impl Into<Dentry>,
    ) -> Result<MountId, MountError> {
        self.check(lower)?;
        let at = self.root(lower);
        self.attach(lower, at, root)
    }

    /// Sets or clears the `locked` flag of `m`.
    pub fn set_locked(&mut self, m: MountId, locked: bool) -> Result<(), MountError> {
        self.check(m)?;
        self.node_mut(m).locked = locked;
        Ok(())
    }

    /// Gives `m` a fresh peer group if it is not shared yet. Returns its group.
    pub fn make_shared(&mut self, m: MountId) -> Result<GroupId, MountError> {
        self.check(m)?;
        if let Some(g) = self.node(m).group {
            return Ok(g);
        }
        let g = GroupId::from_index(self.groups);
        self.groups += 1;
        self.node_mut(m).group = Some(g);
        Ok(g)
    }

    /// Makes `new` a peer of `existing`.
    ///
    /// `new` must be unshared and must not be a slave. It inherits the master
    /// of `existing` and is placed right after it in the master's slave list.
    pub fn add_peer(&mut self, existing: MountId, new: MountId) -> Result<(), MountError> {
        self.check(existing)?;
        self.check(new)?;
        if self.node(new).group.is_some() {
            return Err(MountError::AlreadyShared(new));
        }
        if self.node(new).master.is_some() {
            return Err(MountError::AlreadySlave(new));
        }
        if existing == new || self.receives_from(existing, new) {
            return Err(MountError::PropagationCycle {
                mount: new,
                master: existing,
            });
        }
        let group = self.make_shared(existing)?;

        let after = self.node(existing).peer_next;
        {
            let n = self.node_mut(new);
            n.group = Some(group);
            n.peer_prev = existing;
            n.peer_next = after;
        }
        self.node_mut(existing).peer_next = new;
        self.node_mut(after).peer_prev = new;

        if let Some(master) = self.node(existing).master {
            let pos = self.node(existing).slave_pos + 1;
            self.node_mut(master).slaves.insert(pos, new);
            self.node_mut(new).master = Some(master);
            self.renumber_slaves(master, pos);
        }
        Ok(())
    }

    /// Makes the whole peer group of `slave` receive propagation from `master`.
    ///
    /// The group is appended to `master`'s slave list as one contiguous run.
    pub fn make_slave(&mut self, master: MountId, slave: MountId) -> Result<(), MountError> {
        self.check(master)?;
        self.check(slave)?;
        if self.node(slave).master.is_some() {
            return Err(MountError::AlreadySlave(slave));
        }
        if master == slave || self.are_peers(master, slave) || self.receives_from(master, slave) {
            return Err(MountError::PropagationCycle {
                mount: slave,
                master,
            });
        }
        let run: Vec<MountId> = self.peers_of(slave).collect();
        let start = self.node(master).slaves.len();
        for (i, &s) in run.iter().enumerate() {
            let n = self.node_mut(s);
            n.master = Some(master);
            n.slave_pos = start + i;
        }
        self.node_mut(master).slaves.extend(run);
        Ok(())
    }

    fn renumber_slaves(&mut self, master: MountId, from: usize) {
        let list = std::mem::take(&mut self.node_mut(master).slaves);
        for (pos, &s) in list.iter().enumerate().skip(from) {
            self.node_mut(s).slave_pos = pos;
        }
        self.node_mut(master).slaves = list;
    }

    /// Does `m` (transitively) receive propagation from `src` or one of its peers?
    fn receives_from(&self, m: MountId, src: MountId) -> bool {
        let mut cur = self.node(m).master;
        while let Some(c) = cur {
            if c == src || self.are_peers(c, src) {
                return true;
            }
            cur = self.node(c).master;
        }
        false
    }

    // === Tree queries ===

    /// Parent of `m`; `None` for absolute roots.
    ///
    /// # Panics
    /// Panics if `m` does not belong to this forest (true of all queries).
    #[inline]
    pub fn parent(&self, m: MountId) -> Option<MountId> {
        self.node(m).parent
    }

    /// Dentry of the parent that `m` is attached at.
    #[inline]
    pub fn mountpoint(&self, m: MountId) -> Dentry {
        self.node(m).mountpoint
    }

    /// Dentry of `m` exposed at its mountpoint.
    #[inline]
    pub fn root(&self, m: MountId) -> Dentry {
        self.node(m).root
    }

    #[inline]
    pub fn is_locked(&self, m: MountId) -> bool {
        self.node(m).locked
    }

    #[inline]
    pub fn is_absolute_root(&self, m: MountId) -> bool {
        self.node(m).parent.is_none()
    }

    /// Children of `m` in attach order.
    #[inline]
    pub fn children(&self, m: MountId) -> &[MountId] {
        &self.node(m).children
    }

    /// The child of `parent` attached at `mountpoint`, if any.
    #[inline]
    pub fn lookup(&self, parent: MountId, mountpoint: Dentry) -> Option<MountId> {
        self.index.get(&(parent, mountpoint)).copied()
    }

    /// The child sitting on `m`'s root, hiding it.
    #[inline]
    pub fn overmount(&self, m: MountId) -> Option<MountId> {
        self.lookup(m, self.node(m).root)
    }

    /// Does `child` sit on its parent's root?
    #[inline]
    pub fn overmounts_parent(&self, child: MountId) -> bool {
        self.node(child)
            .parent
            .is_some_and(|p| self.node(p).root == self.node(child).mountpoint)
    }

    /// `m` and all its descendants, parents before children.
    pub fn subtree(&self, m: MountId) -> Vec<MountId> {
        let mut out = Vec::new();
        let mut stack = vec![m];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.node(cur).children.iter().rev().copied());
        }
        out
    }

    // === Propagation queries ===

    #[inline]
    pub fn group(&self, m: MountId) -> Option<GroupId> {
        self.node(m).group
    }

    #[inline]
    pub fn is_shared(&self, m: MountId) -> bool {
        self.node(m).group.is_some()
    }

    /// Master that `m` (and its whole peer group) receives propagation from.
    #[inline]
    pub fn master(&self, m: MountId) -> Option<MountId> {
        self.node(m).master
    }

    /// Slave list of `m`; peer groups appear as contiguous runs.
    #[inline]
    pub fn slaves(&self, m: MountId) -> &[MountId] {
        &self.node(m).slaves
    }

    #[inline]
    pub fn first_slave(&self, m: MountId) -> Option<MountId> {
        self.node(m).slaves.first().copied()
    }

    /// Mount following `m` in its master's slave list.
    #[inline]
    pub fn next_slave(&self, m: MountId) -> Option<MountId> {
        let n = self.node(m);
        let master = n.master?;
        self.node(master).slaves.get(n.slave_pos + 1).copied()
    }

    /// Next mount in `m`'s peer ring (`m` itself when unshared).
    #[inline]
    pub fn next_peer(&self, m: MountId) -> MountId {
        self.node(m).peer_next
    }

    /// Are `a` and `b` members of the same peer group?
    #[inline]
    pub fn are_peers(&self, a: MountId, b: MountId) -> bool {
        let ga = self.node(a).group;
        ga.is_some() && ga == self.node(b).group
    }

    /// `m` followed by the rest of its peer ring.
    pub fn peers_of(&self, m: MountId) -> impl Iterator<Item = MountId> + '_ {
        let mut cur = Some(m);
        std::iter::from_fn(move || {
            let out = cur?;
            let next = self.node(out).peer_next;
            cur = (next != m).then_some(next);
            Some(out)
        })
    }
}

impl DebugInvariants for Forest {
    fn validate_invariants(&self) -> Result<(), MountError> {
        // 1) tree links agree with the mountpoint index
        for parent in self.mounts() {
            for &child in self.children(parent) {
                let c = self.node(child);
                if c.parent != Some(parent) || self.lookup(parent, c.mountpoint) != Some(child) {
                    return Err(MountError::ChildIndexMismatch { parent, child });
                }
            }
        }
        for (&(parent, mountpoint), &child) in &self.index {
            let c = self.node(child);
            if c.parent != Some(parent) || c.mountpoint != mountpoint {
                return Err(MountError::ChildIndexMismatch { parent, child });
            }
        }

        // 2) peer rings are closed, carry one group and one master
        for m in self.mounts() {
            let n = self.node(m);
            if self.node(n.peer_next).peer_prev != m {
                return Err(MountError::PeerGroupMismatch {
                    mount: m,
                    peer: n.peer_next,
                });
            }
            if n.group.is_none() && n.peer_next != m {
                return Err(MountError::PeerGroupMismatch {
                    mount: m,
                    peer: n.peer_next,
                });
            }
            for peer in self.peers_of(m) {
                let p = self.node(peer);
                if p.group != n.group || p.master != n.master {
                    return Err(MountError::PeerGroupMismatch { mount: m, peer });
                }
            }
        }

        // 3) slave lists point back at their master, groups are contiguous
        for master in self.mounts() {
            let slaves = self.slaves(master);
            let mut closed_groups = hashbrown::HashSet::new();
            for (pos, &slave) in slaves.iter().enumerate() {
                let s = self.node(slave);
                if s.master != Some(master) || s.slave_pos != pos {
                    return Err(MountError::SlaveListMismatch { master, slave });
                }
                if let Some(g) = s.group {
                    if closed_groups.contains(&g) {
                        return Err(MountError::SlaveListMismatch { master, slave });
                    }
                    let run_ends = slaves
                        .get(pos + 1)
                        .is_none_or(|&next| self.node(next).group != Some(g));
                    if run_ends {
                        closed_groups.insert(g);
                    }
                }
            }
        }
        Ok(())
    }
}
