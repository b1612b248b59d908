//! Set predicates over a forest: closed, non-revealing, non-shifting.
//!
//! These describe what a caller must hand to
//! [`propagate_umount`](crate::propagation::propagate_umount) and what it gets
//! back. They are plain checks, quadratic in the worst case, meant for
//! validation and tests rather than hot paths.

use crate::mount_error::MountError;
use crate::topology::forest::Forest;
use crate::topology::mount_id::MountId;
use hashbrown::HashSet;

/// Membership view of a set of mounts.
pub type MountSet = HashSet<MountId>;

/// Collect `mounts` into a [`MountSet`].
pub fn member_set(mounts: &[MountId]) -> MountSet {
    mounts.iter().copied().collect()
}

/// Every child of every member is a member.
pub fn check_closed(forest: &Forest, members: &MountSet) -> Result<(), MountError> {
    for &m in members {
        if let Some(&child) = forest.children(m).iter().find(|c| !members.contains(*c)) {
            return Err(MountError::NotClosed { mount: m, child });
        }
    }
    Ok(())
}

/// No locked member has its parent outside the set.
pub fn check_non_revealing(forest: &Forest, members: &MountSet) -> Result<(), MountError> {
    for &m in members {
        if !forest.is_locked(m) {
            continue;
        }
        if let Some(parent) = forest.parent(m)
            && !members.contains(&parent)
        {
            return Err(MountError::Revealing { mount: m });
        }
    }
    Ok(())
}

/// Nothing that stays mounted lives strictly inside a member.
///
/// A non-member child of a member must be that member's root overmount, and
/// the member must be the top of a pure stack of root overmounts within the
/// set: the survivor then only moves down the stack, it never changes place.
pub fn check_non_shifting(forest: &Forest, members: &MountSet) -> Result<(), MountError> {
    for &m in members {
        let overmount = forest.overmount(m);
        for &child in forest.children(m) {
            if members.contains(&child) {
                continue;
            }
            if Some(child) != overmount {
                return Err(MountError::Shifting { mount: m, child });
            }
            let mut z = m;
            while let Some(parent) = forest.parent(z).filter(|p| members.contains(p)) {
                if !forest.overmounts_parent(z) {
                    return Err(MountError::Shifting {
                        mount: parent,
                        child: z,
                    });
                }
                z = parent;
            }
        }
    }
    Ok(())
}

pub fn is_closed(forest: &Forest, members: &MountSet) -> bool {
    check_closed(forest, members).is_ok()
}

pub fn is_non_revealing(forest: &Forest, members: &MountSet) -> bool {
    check_non_revealing(forest, members).is_ok()
}

pub fn is_non_shifting(forest: &Forest, members: &MountSet) -> bool {
    check_non_shifting(forest, members).is_ok()
}

/// Validate a set a caller wants to unmount: non-empty, known ids, no
/// duplicates, closed and non-revealing.
pub fn check_caller_set(forest: &Forest, mounts: &[MountId]) -> Result<(), MountError> {
    if mounts.is_empty() {
        return Err(MountError::EmptySet);
    }
    let mut members = MountSet::with_capacity(mounts.len());
    for &m in mounts {
        if !forest.contains(m) {
            return Err(MountError::UnknownMount(m));
        }
        if !members.insert(m) {
            return Err(MountError::DuplicateInSet(m));
        }
    }
    check_closed(forest, &members)?;
    check_non_revealing(forest, &members)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// r ── a ── b
    ///      └─ top (overmounts a)
    fn small() -> (Forest, [MountId; 4]) {
        let mut f = Forest::new();
        let r = f.add_root(1).unwrap();
        let a = f.attach(r, 10, 100).unwrap();
        let b = f.attach(a, 20, 200).unwrap();
        let top = f.overmount_with(a, 300).unwrap();
        (f, [r, a, b, top])
    }

    #[test]
    fn closed_subtree() {
        let (f, [_, a, b, top]) = small();
        assert!(is_closed(&f, &member_set(&[a, b, top])));
        assert_eq!(
            check_closed(&f, &member_set(&[a, top])),
            Err(MountError::NotClosed { mount: a, child: b })
        );
    }

    #[test]
    fn locked_member_needs_parent() {
        let (mut f, [_, a, b, top]) = small();
        f.set_locked(b, true).unwrap();
        assert!(is_non_revealing(&f, &member_set(&[a, b, top])));
        assert_eq!(
            check_non_revealing(&f, &member_set(&[b])),
            Err(MountError::Revealing { mount: b })
        );
    }

    #[test]
    fn overmount_may_stay_behind() {
        let (f, [_, a, b, top]) = small();
        assert!(is_non_shifting(&f, &member_set(&[a, b])));
        assert_eq!(
            check_non_shifting(&f, &member_set(&[a, top])),
            Err(MountError::Shifting { mount: a, child: b })
        );
    }

    #[test]
    fn stack_must_be_pure_overmounts() {
        // r ── a ── b ── c(overmounts b)
        let mut f = Forest::new();
        let r = f.add_root(1).unwrap();
        let a = f.attach(r, 10, 100).unwrap();
        let b = f.attach(a, 20, 200).unwrap();
        let _c = f.overmount_with(b, 300).unwrap();
        // c stays on b, but b is inside a: c would move from a/20 to r/10
        assert_eq!(
            check_non_shifting(&f, &member_set(&[a, b])),
            Err(MountError::Shifting { mount: a, child: b })
        );
        assert!(is_non_shifting(&f, &member_set(&[b])));
    }

    #[test]
    fn caller_set_errors() {
        let (f, [_, a, b, top]) = small();
        assert_eq!(check_caller_set(&f, &[]), Err(MountError::EmptySet));
        assert_eq!(
            check_caller_set(&f, &[a, b, top, b]),
            Err(MountError::DuplicateInSet(b))
        );
        let ghost = MountId::new(99).unwrap();
        assert_eq!(
            check_caller_set(&f, &[ghost]),
            Err(MountError::UnknownMount(ghost))
        );
        assert_eq!(check_caller_set(&f, &[a, b, top]), Ok(()));
    }
}
