//! Dry runs describe the walk without touching the ledger or the journal.

use serde_json::json;
use tokenrail::journal::{Journal, MemoryJournal};
use tokenrail::logging::TS_ZERO;
use tokenrail::types::{ActionId, ExecutionRecord, OutcomeState, RunMode, Value};

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator};

#[test]
fn dry_run_submits_nothing_and_writes_nothing() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let r = api.run(&plan, &journal, RunMode::DryRun).unwrap();
    assert!(r.ok(), "{}", r.render());
    assert!(sim.submissions().is_empty());
    assert_eq!(sim.reads(), 0);
    assert!(journal.records().unwrap().is_empty());
    assert!(r
        .outcomes
        .iter()
        .all(|o| o.state == OutcomeState::WouldSubmit));
    assert!(r.log.is_empty());
}

#[test]
fn dry_run_reports_already_confirmed_actions() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");
    let whitelist = ActionId::from("deploy_whitelist_0");
    journal
        .put(
            &whitelist,
            ExecutionRecord::confirmed(
                vec![Value::Address(tokenrail::adapters::signer_address("wl"))],
                None,
                1,
            ),
        )
        .unwrap();

    let r = api.run(&plan, &journal, RunMode::DryRun).unwrap();
    assert_eq!(
        r.outcome(&whitelist).unwrap().state,
        OutcomeState::AlreadyConfirmed
    );
    assert_eq!(r.already_confirmed().len(), 1);
    assert_eq!(journal.records().unwrap().len(), 1);
}

#[test]
fn dry_run_facts_are_stable() {
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");
    let before = facts.all().len();

    api.run(&plan, &journal, RunMode::DryRun).unwrap();
    let first: Vec<_> = facts.all().split_off(before);
    let mid = facts.all().len();
    api.run(&plan, &journal, RunMode::DryRun).unwrap();
    let second: Vec<_> = facts.all().split_off(mid);

    assert!(!first.is_empty());
    assert!(first.iter().all(|f| f["ts"] == json!(TS_ZERO)));
    assert!(first.iter().all(|f| f.get("duration_ms").is_none()));
    assert_eq!(first, second);
}
