//! Concurrent dispatch never puts two transactions of one signer in flight.

use std::sync::Arc;

use tokenrail::adapters::{SimKind, SimLedger};
use tokenrail::graph::PlanBuilder;
use tokenrail::journal::MemoryJournal;
use tokenrail::policy::types::Execution;
use tokenrail::types::{Action, RunMode};

use crate::common::{fast_policy, orchestrator};

#[test]
fn independent_signers_run_in_parallel() {
    let sim = SimLedger::new().with_latency_ms(30);
    sim.register("Box", SimKind::Generic);
    let sim = Arc::new(sim);
    let mut b = PlanBuilder::new("fan");
    for signer in ["alice", "bob", "carol"] {
        for i in 0..2 {
            b.push(Action::deploy(format!("{signer}_{i}"), "Box", vec![]).signed_by(signer));
        }
    }
    let plan = b.finish().unwrap();

    let mut policy = fast_policy();
    policy.execution = Execution::per_signer();
    let (api, _) = orchestrator(policy, &sim);
    let journal = MemoryJournal::new("fan");
    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();

    assert!(r.ok(), "{}", r.render());
    assert_eq!(r.confirmed().len(), 6);
    assert!(sim.max_in_flight() > 1);
    assert_eq!(sim.signer_conflicts(), 0);
}

#[test]
fn per_signer_lethe_commit_matches_serial_outcome() {
    let sim = crate::common::lethe_sim();
    let mut policy = fast_policy();
    policy.execution = Execution::per_signer();
    let (api, _) = orchestrator(policy, &sim);
    let plan = api.plan(&crate::common::lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");
    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(r.ok(), "{}", r.render());
    assert_eq!(sim.signer_conflicts(), 0);
    assert_eq!(sim.submissions().iter().filter(|s| s.ok).count(), 22);
}
