#![allow(dead_code)]
use mount_propagation::prelude::*;
use mount_propagation::topology::validation::member_set;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub fn d(raw: u64) -> Dentry {
    Dentry(raw)
}

/// Run the umount of `target`'s subtree.
pub fn umount_subtree(forest: &Forest, target: MountId) -> UmountPlan {
    let set = UmountSet::from_subtree(forest, target).unwrap();
    propagate_umount(forest, &set)
}

/// `got` lists exactly the members of `want`, once each, in any order.
pub fn assert_same_mounts(got: &[MountId], want: &MountSet) {
    let mut got_sorted = got.to_vec();
    got_sorted.sort_unstable();
    let mut want_sorted: Vec<MountId> = want.iter().copied().collect();
    want_sorted.sort_unstable();
    assert_eq!(got_sorted, want_sorted, "mount lists differ");
}

/// Does `q` receive propagation from `p`? Straight from the definition:
/// a peer of `p`, or a master chain that reaches `p`'s peer group.
pub fn receives_from(forest: &Forest, q: MountId, p: MountId) -> bool {
    if q == p {
        return false;
    }
    if forest.are_peers(q, p) {
        return true;
    }
    let mut cur = forest.master(q);
    while let Some(c) = cur {
        if c == p || forest.are_peers(c, p) {
            return true;
        }
        cur = forest.master(c);
    }
    false
}

/// Candidates found by looking at every mount of the forest, no skipping.
pub fn naive_candidates(forest: &Forest, initial: &MountSet) -> MountSet {
    let mut out = MountSet::new();
    for &m in initial {
        let Some(parent) = forest.parent(m) else {
            continue;
        };
        let mountpoint = forest.mountpoint(m);
        for q in forest.mounts() {
            if !receives_from(forest, q, parent) {
                continue;
            }
            if let Some(c) = forest.lookup(q, mountpoint) {
                if !initial.contains(&c) {
                    out.insert(c);
                }
            }
        }
    }
    out
}

/// Some mount reachable from `c` through members of `t` has a child outside `t`.
fn leaks(forest: &Forest, t: &MountSet, c: MountId) -> bool {
    let mut stack = vec![c];
    while let Some(y) = stack.pop() {
        for &z in forest.children(y) {
            if !t.contains(&z) {
                return true;
            }
            stack.push(z);
        }
    }
    false
}

fn forbidden(forest: &Forest, t: &MountSet, x: MountId) -> bool {
    if forest.is_locked(x) && forest.parent(x).is_none_or(|p| !t.contains(&p)) {
        return true;
    }
    let over = forest.overmount(x);
    forest
        .children(x)
        .iter()
        .any(|&c| Some(c) != over && (!t.contains(&c) || leaks(forest, t, c)))
}

/// Brute-force umount: naive gathering, then drop forbidden candidates until
/// nothing changes. Quadratic or worse; only for small forests.
pub fn reference_umount(forest: &Forest, initial: &[MountId]) -> MountSet {
    let u = member_set(initial);
    let candidates = naive_candidates(forest, &u);
    let mut t: MountSet = u.union(&candidates).copied().collect();
    loop {
        let doomed: Vec<MountId> = candidates
            .iter()
            .copied()
            .filter(|&x| t.contains(&x) && forbidden(forest, &t, x))
            .collect();
        if doomed.is_empty() {
            return t;
        }
        for x in doomed {
            t.remove(&x);
        }
    }
}

/// Every child of a member is a member, or a surviving overmount that has a
/// reparent directive.
pub fn assert_closed_modulo_reparent(forest: &Forest, plan: &UmountPlan) {
    let members = plan.members();
    for &m in &plan.set {
        for &c in forest.children(m) {
            if members.contains(&c) {
                continue;
            }
            assert_eq!(forest.overmount(m), Some(c), "{c} left inside {m}");
            assert!(
                plan.reparent.iter().any(|r| r.mount == c),
                "surviving overmount {c} of {m} has no directive"
            );
        }
    }
}

/// Random forest of about `size` mounts plus an unlocked, non-root umount
/// target.
///
/// Dentries come from a tiny range so lookups collide, overmounts are common
/// and propagation actually lands somewhere.
pub fn random_forest(seed: u64, size: usize) -> (Forest, MountId) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut f = Forest::new();
    let root = f.add_root(0).unwrap();
    let first = f.attach(root, 1, rng.gen_range(0..4u64)).unwrap();
    let mut mounts = vec![root, first];

    for _ in 2..size {
        let parent = mounts[rng.gen_range(0..mounts.len())];
        let mountpoint = rng.gen_range(0..4u64);
        let dentry = rng.gen_range(0..4u64);
        if let Ok(m) = f.attach(parent, mountpoint, dentry) {
            if rng.gen_bool(0.25) {
                f.set_locked(m, true).unwrap();
            }
            mounts.push(m);
        }
    }

    for _ in 0..size {
        let a = mounts[rng.gen_range(1..mounts.len())];
        let b = mounts[rng.gen_range(1..mounts.len())];
        // rejected edges leave the forest untouched
        let _ = match rng.gen_range(0..3) {
            0 => f.add_peer(a, b),
            1 => f.make_slave(a, b),
            _ => Ok(()),
        };
    }

    let target = mounts[rng.gen_range(1..mounts.len())];
    f.set_locked(target, false).unwrap();
    (f, target)
}
