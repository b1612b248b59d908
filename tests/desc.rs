use mount_propagation::prelude::*;
use serde_json::json;

const LOCKED_FAN: &str = include_str!("data/locked_fan.json");

fn locked_fan() -> NamedForest {
    let desc: ForestDesc = serde_json::from_str(LOCKED_FAN).unwrap();
    desc.build().unwrap()
}

#[test]
fn fixture_builds_the_described_forest() {
    let named = locked_fan();
    let f = &named.forest;
    let [a0, a1, a2, s, m1, m2, over] =
        ["a0", "a1", "a2", "s", "m1", "m2", "over"].map(|n| named.id(n).unwrap());

    assert_eq!(f.len(), 10);
    assert!(f.are_peers(a0, a1) && f.are_peers(a1, a2));
    assert_eq!(f.master(s), Some(a2));
    assert!(f.is_locked(m1));
    assert_eq!(f.overmount(m2), Some(over));
    f.validate_invariants().unwrap();
}

#[test]
fn fixture_umount_plan() {
    let named = locked_fan();
    let f = &named.forest;
    let m0 = named.id("m0").unwrap();

    let plan = propagate_umount(f, &UmountSet::from_subtree(f, m0).unwrap());
    assert_eq!(named.names(plan.set.iter().copied()), vec!["m0", "ms", "m2"]);
    assert_eq!(plan.stats.discarded, 1);

    let reparent = serde_json::to_value(&plan.reparent).unwrap();
    assert_eq!(
        reparent,
        json!([{
            "mount": named.id("over").unwrap().get(),
            "new_parent": named.id("a2").unwrap().get(),
            "mountpoint": 20,
        }])
    );
}

#[test]
fn description_round_trips_through_json() {
    let desc: ForestDesc = serde_json::from_str(LOCKED_FAN).unwrap();
    let text = serde_json::to_string(&desc).unwrap();
    let back: ForestDesc = serde_json::from_str(&text).unwrap();
    assert_eq!(back, desc);
}

#[test]
fn bad_descriptions_are_rejected() {
    let cycle: ForestDesc = serde_json::from_value(json!({
        "mounts": [
            { "name": "r", "root": 1 },
            { "name": "a", "parent": "r", "mountpoint": 2 },
            { "name": "b", "parent": "r", "mountpoint": 3 }
        ],
        "slaves": [
            { "master": "a", "slave": "b" },
            { "master": "b", "slave": "a" }
        ]
    }))
    .unwrap();
    assert!(matches!(
        cycle.build(),
        Err(MountError::PropagationCycle { .. })
    ));

    let busy: ForestDesc = serde_json::from_value(json!({
        "mounts": [
            { "name": "r", "root": 1 },
            { "name": "a", "parent": "r", "mountpoint": 2 },
            { "name": "b", "parent": "r", "mountpoint": 2 }
        ]
    }))
    .unwrap();
    assert!(matches!(
        busy.build(),
        Err(MountError::MountpointBusy { .. })
    ));

    let dangling: ForestDesc = serde_json::from_value(json!({
        "mounts": [{ "name": "r", "root": 1 }],
        "peers": [["r", "ghost"]]
    }))
    .unwrap();
    assert_eq!(
        dangling.build().unwrap_err(),
        MountError::UnknownName("ghost".into())
    );
}
