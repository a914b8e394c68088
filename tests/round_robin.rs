use cclsim::prelude::*;

fn tx_start_order(report: &Report) -> Vec<(ChunkId, u32)> {
    report
        .trace
        .iter()
        .filter_map(|record| match &record.kind {
            TraceKind::TxStart(p) => Some((p.chunk.clone(), p.seq)),
            _ => None,
        })
        .collect()
}

fn two_flow_sim(quantum: Option<u32>) -> Sim {
    let mut sim = Sim::new(Params {
        payload_bytes: 1000,
        trace: true,
        ..Params::default()
    })
    .unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    if let Some(quantum) = quantum {
        sim.node_config(
            "a",
            NodeConfig {
                quantum: Some(quantum),
                ..NodeConfig::default()
            },
        )
        .unwrap();
    }

    sim.install_all([
        PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 2000, ["a", "b"]),
        PolicyEntry::new(1u64, "a", "b", 1, Rate::Max, 2000, ["a", "b"]),
    ])
    .unwrap();
    sim.produce(0u64, "a").unwrap();
    sim.produce(1u64, "a").unwrap();
    sim
}

#[test]
fn two_qps_quantum_one_interleave() {
    let report = two_flow_sim(None).run().unwrap();
    assert_eq!(
        tx_start_order(&report),
        [
            (ChunkId::from(0u64), 0),
            (ChunkId::from(1u64), 0),
            (ChunkId::from(0u64), 1),
            (ChunkId::from(1u64), 1),
        ]
    );
}

#[test]
fn two_qps_quantum_two_serve_in_blocks() {
    let report = two_flow_sim(Some(2)).run().unwrap();
    assert_eq!(
        tx_start_order(&report),
        [
            (ChunkId::from(0u64), 0),
            (ChunkId::from(0u64), 1),
            (ChunkId::from(1u64), 0),
            (ChunkId::from(1u64), 1),
        ]
    );
}

#[test]
fn same_qp_is_strict_fifo() {
    // Both chunks share qpid 0, so they occupy the same queue pair and the
    // round-robin arbiter never interleaves them.
    let mut sim = Sim::new(Params {
        payload_bytes: 1000,
        trace: true,
        ..Params::default()
    })
    .unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.install_all([
        PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 2000, ["a", "b"]),
        PolicyEntry::new(1u64, "a", "b", 0, Rate::Max, 2000, ["a", "b"]),
    ])
    .unwrap();
    sim.produce(0u64, "a").unwrap();
    sim.produce(1u64, "a").unwrap();

    let report = sim.run().unwrap();
    assert_eq!(
        tx_start_order(&report),
        [
            (ChunkId::from(0u64), 0),
            (ChunkId::from(0u64), 1),
            (ChunkId::from(1u64), 0),
            (ChunkId::from(1u64), 1),
        ]
    );
}

#[test]
fn backlogged_qps_receive_proportional_service() {
    // Three continuously backlogged flows, quantum 1: service cycles
    // through them one packet at a time.
    let mut sim = Sim::new(Params {
        payload_bytes: 1000,
        trace: true,
        ..Params::default()
    })
    .unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();
    sim.install_all((0..3u64).map(|flow| {
        PolicyEntry::new(flow, "a", "b", flow as Qpid, Rate::Max, 5000, ["a", "b"])
    }))
    .unwrap();
    for flow in 0..3u64 {
        sim.produce(flow, "a").unwrap();
    }

    let report = sim.run().unwrap();
    let order = tx_start_order(&report);
    assert_eq!(order.len(), 15);

    // Every full cycle serves each flow exactly once.
    for cycle in order.chunks(3) {
        let mut flows: Vec<&ChunkId> = cycle.iter().map(|(chunk, _)| chunk).collect();
        flows.sort();
        flows.dedup();
        assert_eq!(flows.len(), 3, "unfair cycle: {cycle:?}");
    }

    // Within each flow the sequence order is strict FIFO.
    for flow in 0..3u64 {
        let seqs: Vec<u32> = order
            .iter()
            .filter(|(chunk, _)| *chunk == ChunkId::from(flow))
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(seqs, [0, 1, 2, 3, 4]);
    }
}

#[test]
fn late_qp_registers_at_the_end_of_the_rotation() {
    // Flow 1 only starts once chunk 1 completes its first hop; its queue
    // pair joins the rotation after flow 0s without disturbing it.
    let mut sim = Sim::new(Params {
        payload_bytes: 1000,
        trace: true,
        ..Params::default()
    })
    .unwrap();
    sim.add_link("c", "a", 10e9, 0.0).unwrap();
    sim.add_link("a", "b", 10e9, 0.0).unwrap();

    sim.install_all([
        PolicyEntry::new(0u64, "a", "b", 0, Rate::Max, 6000, ["a", "b"]),
        PolicyEntry::new(1u64, "c", "a", 0, Rate::Max, 1000, ["c", "a"]),
        PolicyEntry::new(1u64, "a", "b", 1, Rate::Max, 2000, ["a", "b"]),
    ])
    .unwrap();
    sim.produce(0u64, "a").unwrap();
    sim.produce(1u64, "c").unwrap();

    let report = sim.run().unwrap();
    let order: Vec<(ChunkId, u32)> = report
        .trace
        .iter()
        .filter_map(|record| match &record.kind {
            TraceKind::TxStart(p) if record.node == NodeId::from("a") => {
                Some((p.chunk.clone(), p.seq))
            }
            _ => None,
        })
        .collect();

    // Chunk 1 reaches a at t = 800 ns, while a is serializing chunk 0
    // packet #1. From then on the two flows alternate.
    assert_eq!(
        order,
        [
            (ChunkId::from(0u64), 0),
            (ChunkId::from(0u64), 1),
            (ChunkId::from(1u64), 0),
            (ChunkId::from(0u64), 2),
            (ChunkId::from(1u64), 1),
            (ChunkId::from(0u64), 3),
            (ChunkId::from(0u64), 4),
            (ChunkId::from(0u64), 5),
        ]
    );
}
