//! Per-invocation side table: transient mount flags and the candidate list.
//!
//! Nothing here is stored on the [`Forest`](crate::topology::forest::Forest).
//! A [`Scratch`] is sized to the forest once and handed back clean after
//! every run: only the entries that were touched get reset, so reusing it costs
//! time proportional to the gathered set, not to the forest.

use crate::topology::mount_id::MountId;

bitflags::bitflags! {
    /// Transient state of one mount during one umount computation.
    #[derive(Default)]
    pub(crate) struct MountFlags: u8 {
        /// In `U ∪ Candidates` (during gathering also marks visited `U` members).
        const CANDIDATE = 1 << 0;
        /// Already walked through by an ancestor trim.
        const MARKED = 1 << 1;
        /// Committed: will be unmounted. Hidden from its parent's children.
        const UMOUNT = 1 << 2;
    }
}

/// Doubly-linked list threaded through arena indices.
///
/// Unlinking any member is O(1). While walking the list, the element being
/// visited may be unlinked; other elements may be unlinked as long as they are
/// not the saved lookahead.
#[derive(Debug, Default)]
pub(crate) struct MountList {
    head: Option<MountId>,
    tail: Option<MountId>,
    prev: Vec<Option<MountId>>,
    next: Vec<Option<MountId>>,
    linked: Vec<bool>,
    len: usize,
}

impl MountList {
    fn resize(&mut self, n: usize) {
        if self.linked.len() < n {
            self.prev.resize(n, None);
            self.next.resize(n, None);
            self.linked.resize(n, false);
        }
    }

    #[inline]
    pub(crate) fn front(&self) -> Option<MountId> {
        self.head
    }

    /// Successor of a linked element.
    #[inline]
    pub(crate) fn next(&self, m: MountId) -> Option<MountId> {
        self.next[m.index()]
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_linked(&self, m: MountId) -> bool {
        self.linked[m.index()]
    }

    pub(crate) fn push_back(&mut self, m: MountId) {
        debug_assert!(!self.is_linked(m), "mount {m} linked twice");
        let i = m.index();
        self.prev[i] = self.tail;
        self.next[i] = None;
        self.linked[i] = true;
        match self.tail {
            Some(t) => self.next[t.index()] = Some(m),
            None => self.head = Some(m),
        }
        self.tail = Some(m);
        self.len += 1;
    }

    /// Unlinks `m`; a no-op if it is not on the list.
    pub(crate) fn unlink(&mut self, m: MountId) {
        let i = m.index();
        if !self.linked[i] {
            return;
        }
        let (prev, next) = (self.prev[i], self.next[i]);
        match prev {
            Some(p) => self.next[p.index()] = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.prev[n.index()] = prev,
            None => self.tail = prev,
        }
        self.prev[i] = None;
        self.next[i] = None;
        self.linked[i] = false;
        self.len -= 1;
    }

    fn clear(&mut self) {
        while let Some(m) = self.head {
            self.unlink(m);
        }
    }
}

/// Flags plus the candidate worklist for one umount computation.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    flags: Vec<MountFlags>,
    touched: Vec<MountId>,
    pub(crate) candidates: MountList,
}

impl Scratch {
    /// Make room for a forest of `n` mounts. Entries must be clean.
    pub(crate) fn prepare(&mut self, n: usize) {
        if self.flags.len() < n {
            self.flags.resize(n, MountFlags::empty());
        }
        self.candidates.resize(n);
    }

    #[inline]
    pub(crate) fn has(&self, m: MountId, f: MountFlags) -> bool {
        self.flags[m.index()].intersects(f)
    }

    #[inline]
    pub(crate) fn set(&mut self, m: MountId, f: MountFlags) {
        let slot = &mut self.flags[m.index()];
        if slot.is_empty() {
            self.touched.push(m);
        }
        slot.insert(f);
    }

    #[inline]
    pub(crate) fn clear(&mut self, m: MountId, f: MountFlags) {
        self.flags[m.index()].remove(f);
    }

    #[inline]
    pub(crate) fn is_candidate(&self, m: MountId) -> bool {
        self.has(m, MountFlags::CANDIDATE)
    }

    #[inline]
    pub(crate) fn will_be_unmounted(&self, m: MountId) -> bool {
        self.has(m, MountFlags::UMOUNT)
    }

    /// Drop `m` from the candidates: clear its candidate and walk marks and
    /// unlink it from the worklist.
    pub(crate) fn remove_candidate(&mut self, m: MountId) {
        self.clear(m, MountFlags::CANDIDATE | MountFlags::MARKED);
        self.candidates.unlink(m);
    }

    /// Reset every entry touched since the last reset.
    pub(crate) fn reset(&mut self) {
        for m in self.touched.drain(..) {
            self.flags[m.index()] = MountFlags::empty();
        }
        self.candidates.clear();
        // full scan, linear in the forest rather than in the gathered set
        #[cfg(feature = "strict-invariants")]
        assert!(
            self.flags.iter().all(|f| f.is_empty()),
            "[invariants] scratch left dirty after reset"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(raw: u32) -> MountId {
        MountId::new(raw).unwrap()
    }

    #[test]
    fn list_unlink_anywhere() {
        let mut l = MountList::default();
        l.resize(8);
        for raw in 1..=4 {
            l.push_back(m(raw));
        }
        l.unlink(m(2));
        l.unlink(m(4));
        l.unlink(m(4));
        assert_eq!(l.len(), 2);
        assert_eq!(l.front(), Some(m(1)));
        assert_eq!(l.next(m(1)), Some(m(3)));
        assert_eq!(l.next(m(3)), None);
        l.unlink(m(1));
        assert_eq!(l.front(), Some(m(3)));
        l.unlink(m(3));
        assert_eq!(l.len(), 0);
        assert_eq!(l.front(), None);
    }

    #[test]
    fn removing_current_while_walking() {
        let mut l = MountList::default();
        l.resize(8);
        for raw in 1..=5 {
            l.push_back(m(raw));
        }
        let mut seen = Vec::new();
        let mut cur = l.front();
        while let Some(x) = cur {
            let next = l.next(x);
            seen.push(x.get());
            if x.get() % 2 == 1 {
                l.unlink(x);
            }
            cur = next;
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(l.len(), 2);
        assert_eq!(l.front(), Some(m(2)));
    }

    #[test]
    fn reset_clears_only_touched() {
        let mut s = Scratch::default();
        s.prepare(4);
        s.set(m(1), MountFlags::CANDIDATE);
        s.set(m(1), MountFlags::MARKED);
        s.set(m(3), MountFlags::UMOUNT);
        s.candidates.push_back(m(1));
        assert!(s.is_candidate(m(1)));
        assert!(s.will_be_unmounted(m(3)));
        s.remove_candidate(m(1));
        assert!(!s.has(m(1), MountFlags::CANDIDATE | MountFlags::MARKED));
        s.reset();
        assert!(!s.will_be_unmounted(m(3)));
        assert!(s.touched.is_empty());
        assert_eq!(s.candidates.len(), 0);
    }
}
