use cclsim::prelude::*;

#[test]
fn rejects_nonsensical_params() {
    assert!(matches!(
        Sim::new(Params {
            payload_bytes: 0,
            ..Params::default()
        }),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        Sim::new(Params {
            default_quantum: 0,
            ..Params::default()
        }),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        Sim::new(Params {
            horizon: Some(-1.0),
            ..Params::default()
        }),
        Err(SimError::InvalidDelay(_))
    ));
}

#[test]
fn rejects_bad_links() {
    let mut sim = Sim::new(Params::default()).unwrap();
    assert!(matches!(
        sim.add_link("a", "b", 0.0, 0.0),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        sim.add_link("a", "b", 10e9, -1e-6),
        Err(SimError::InvalidDelay(_))
    ));
    assert!(matches!(
        sim.add_link("a", "a", 10e9, 0.0),
        Err(SimError::InvalidConfig(_))
    ));

    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    assert!(matches!(
        sim.add_link("a", "b", 10e9, 0.0),
        Err(SimError::InvalidConfig(_))
    ));
}

#[test]
fn rejects_malformed_entries_at_install() {
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();

    // Path does not start at src.
    assert!(matches!(
        sim.install(PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 100, ["b", "a"])),
        Err(SimError::InvalidPolicy(_))
    ));
    // Non-positive rate.
    assert!(matches!(
        sim.install(PolicyEntry::new(
            0u64,
            "a",
            "b",
            0,
            Rate::Bps(-1.0),
            100,
            ["a", "b"]
        )),
        Err(SimError::InvalidPolicy(_))
    ));
}

#[test]
fn rejects_unknown_nodes_and_edges_at_build() {
    // Unknown node on the path.
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.install(PolicyEntry::new(
        0u64,
        "a",
        "x",
        0,
        Rate::Max,
        100,
        ["a", "x"],
    ))
    .unwrap();
    assert!(matches!(sim.run(), Err(SimError::InvalidPolicy(_))));

    // Known nodes, but the hop is not a directed edge.
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.add_link("c", "b", 10e9, 0.0).unwrap();
    sim.install(PolicyEntry::new(
        0u64,
        "a",
        "c",
        0,
        Rate::Max,
        100,
        ["a", "c"],
    ))
    .unwrap();
    assert!(matches!(sim.run(), Err(SimError::InvalidPolicy(_))));

    // Production declaration at an unknown node.
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.produce(0u64, "x").unwrap();
    assert!(matches!(sim.run(), Err(SimError::InvalidPolicy(_))));
}

#[test]
fn rejects_configs_for_unknown_targets_at_build() {
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.node_config("x", NodeConfig::default()).unwrap();
    assert!(matches!(sim.run(), Err(SimError::InvalidConfig(_))));

    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.schedule_line_rate(0.0, "b", "a", 5e9).unwrap();
    assert!(matches!(sim.run(), Err(SimError::InvalidConfig(_))));
}

#[test]
fn rejects_bad_rate_updates_at_schedule_time() {
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    assert!(matches!(
        sim.schedule_line_rate(0.0, "a", "b", -5e9),
        Err(SimError::InvalidConfig(_))
    ));
    assert!(matches!(
        sim.schedule_line_rate(-1.0, "a", "b", 5e9),
        Err(SimError::InvalidDelay(_))
    ));
}

#[test]
fn empty_topology_cannot_run() {
    let sim = Sim::new(Params::default()).unwrap();
    assert!(matches!(sim.run(), Err(SimError::InvalidConfig(_))));
}

#[test]
fn zero_node_quantum_is_rejected() {
    let mut sim = Sim::new(Params::default()).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    assert!(matches!(
        sim.node_config(
            "a",
            NodeConfig {
                quantum: Some(0),
                ..NodeConfig::default()
            }
        ),
        Err(SimError::InvalidConfig(_))
    ));
}

#[test]
fn duplicate_delivery_aborts_the_run() {
    // Two sources transmit the same chunk to the same destination; the
    // second completion deposits duplicate sequence numbers, which the
    // model treats as a protocol error.
    let mut sim = Sim::new(Params {
        payload_bytes: 1000,
        ..Params::default()
    })
    .unwrap();
    sim.add_link("a", "c", 10e9, 0.0).unwrap();
    sim.add_link("b", "c", 10e9, 1e-6).unwrap();

    sim.install_all([
        PolicyEntry::new(0u64, "a", "c", 0, Rate::Max, 2000, ["a", "c"]),
        PolicyEntry::new(0u64, "b", "c", 0, Rate::Max, 2000, ["b", "c"]),
    ])
    .unwrap();
    sim.produce(0u64, "a").unwrap();
    sim.produce(0u64, "b").unwrap();

    let err = sim.run().unwrap_err();
    match err {
        SimError::DuplicatePacket { packet, node, .. } => {
            assert_eq!(node, NodeId::from("c"));
            assert_eq!(packet.chunk, ChunkId::from(0u64));
        }
        other => panic!("expected DuplicatePacket, got {other:?}"),
    }
}
