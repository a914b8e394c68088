use cclsim::prelude::*;

fn params() -> Params {
    Params {
        payload_bytes: 1000,
        trace: true,
        ..Params::default()
    }
}

#[test]
fn store_and_forward_over_two_hops() {
    let mut sim = Sim::new(params()).unwrap();
    sim.add_link("a", "b", 10e9, 1e-6).unwrap();
    sim.add_link("b", "c", 10e9, 1e-6).unwrap();
    sim.install(PolicyEntry::new(
        0u64,
        "a",
        "c",
        0,
        Rate::Max,
        4000,
        ["a", "b", "c"],
    ))
    .unwrap();
    sim.produce(0u64, "a").unwrap();

    let report = sim.run().unwrap();

    // Four packets of 800 ns each. The relay b cannot begin serializing a
    // packet before it fully received it: the last packet leaves a at
    // 3.2 us, reaches b at 4.2 us, leaves b at 5.0 us and arrives at c at
    // 6.0 us.
    assert_eq!(report.completion_time(0u64, "c"), Some(6.0e-6));

    // No transmission on b -> c starts before the first packet fully
    // arrived at b (1.8 us).
    let first_relay_tx = report
        .trace
        .iter()
        .find(|record| {
            matches!(record.kind, TraceKind::TxStart(_)) && record.node == NodeId::from("b")
        })
        .map(|record| record.time)
        .unwrap();
    assert_eq!(first_relay_tx, SimTime::from(1.8e-6));
}

#[test]
fn relay_keeps_flow_order() {
    let mut sim = Sim::new(params()).unwrap();
    sim.add_link("a", "b", 10e9, 1e-6).unwrap();
    sim.add_link("b", "c", 10e9, 1e-6).unwrap();
    sim.install(PolicyEntry::new(
        0u64,
        "a",
        "c",
        0,
        Rate::Max,
        8000,
        ["a", "b", "c"],
    ))
    .unwrap();
    sim.produce(0u64, "a").unwrap();

    let report = sim.run().unwrap();

    let delivered: Vec<u32> = report
        .trace
        .iter()
        .filter_map(|record| match &record.kind {
            TraceKind::Delivered(p) => Some(p.seq),
            _ => None,
        })
        .collect();
    assert_eq!(delivered, (0..8).collect::<Vec<_>>());
}

#[test]
fn forward_delay_shifts_the_relay() {
    let mut sim = Sim::new(params()).unwrap();
    sim.add_link("a", "b", 10e9, 1e-6).unwrap();
    sim.add_link("b", "c", 10e9, 1e-6).unwrap();
    sim.node_config(
        "b",
        NodeConfig {
            forward_delay: 1e-6,
            ..NodeConfig::default()
        },
    )
    .unwrap();
    sim.install(PolicyEntry::new(
        0u64,
        "a",
        "c",
        0,
        Rate::Max,
        4000,
        ["a", "b", "c"],
    ))
    .unwrap();
    sim.produce(0u64, "a").unwrap();

    let report = sim.run().unwrap();

    // Each packet spends an extra 1 us at b before the next egress: the
    // last packet reaches b at 4.2 us, is forwarded at 5.2 us, leaves b at
    // 6.0 us and arrives at 7.0 us.
    assert_eq!(report.completion_time(0u64, "c"), Some(7.0e-6));
}

#[test]
fn store_delay_postpones_chunk_availability() {
    let mut sim = Sim::new(params()).unwrap();
    sim.add_link("a", "b", 10e9, 1e-6).unwrap();
    sim.node_config(
        "b",
        NodeConfig {
            store_delay: 1e-6,
            ..NodeConfig::default()
        },
    )
    .unwrap();
    sim.install(PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 3000, ["a", "b"]))
        .unwrap();
    sim.produce(0u64, "a").unwrap();

    let report = sim.run().unwrap();

    // Last packet at 3.4 us, plus the stores 1 us.
    assert_eq!(report.completion_time(0u64, "b"), Some(4.4e-6));
    assert_eq!(report.tx_complete_time(0u64, "a", "b"), Some(4.4e-6));
}

#[test]
fn tx_proc_delay_is_charged_per_packet() {
    let mut sim = Sim::new(params()).unwrap();
    sim.add_link("a", "b", 10e9, 1e-6).unwrap();
    sim.node_config(
        "a",
        NodeConfig {
            tx_proc_delay: 100e-9,
            ..NodeConfig::default()
        },
    )
    .unwrap();
    sim.install(PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 3000, ["a", "b"]))
        .unwrap();
    sim.produce(0u64, "a").unwrap();

    let report = sim.run().unwrap();

    // 900 ns of port occupancy per packet instead of 800 ns.
    assert_eq!(report.completion_time(0u64, "b"), Some(3.7e-6));
}
