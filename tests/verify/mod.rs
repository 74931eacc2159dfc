//! Supply pre-check and post-run balance verification.

use tokenrail::journal::MemoryJournal;
use tokenrail::types::{Amount, FindingStatus, RunMode, SupplyDelta};

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator};

fn short_spec() -> tokenrail::types::CampaignSpec {
    let mut spec = lethe_spec();
    spec.allocations
        .retain(|a| matches!(a.name.as_str(), "ICO" | "TEAM" | "TREASURY"));
    spec
}

#[test]
fn shortfall_is_reported_with_the_exact_delta() {
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&short_spec()).unwrap();

    let v = api.precheck(&plan);
    assert!(!v.ok());
    let supply = v.supply.unwrap();
    assert_eq!(
        supply.delta,
        SupplyDelta::Shortfall(Amount::tokens(462_300_000, 18))
    );
    assert_eq!(supply.allocations, vec!["ICO", "TEAM", "TREASURY"]);
    let fact = facts.find("precheck", "failure");
    assert_eq!(fact.len(), 1);
    assert_eq!(fact[0]["error_id"], "E_SUPPLY_MISMATCH");
}

#[test]
fn supply_mismatch_stops_the_run_before_any_ledger_call() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&short_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert_eq!(r.error_id.as_deref(), Some("E_SUPPLY_MISMATCH"));
    assert_eq!(r.exit_code(), 20);
    assert!(sim.submissions().is_empty());
    assert_eq!(sim.reads(), 0);
    assert_eq!(r.not_attempted().len(), plan.len());
    assert!(r.render().contains("shortfall"));
}

#[test]
fn disabled_precheck_lets_the_run_proceed() {
    let sim = lethe_sim();
    let mut policy = fast_policy();
    policy.verification.precheck_supply = false;
    policy.verification.verify_live_balances = false;
    let (api, _) = orchestrator(policy, &sim);
    let plan = api.plan(&short_spec()).unwrap();
    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    assert!(r.ok(), "{}", r.render());
    assert!(!sim.submissions().is_empty());
}

#[test]
fn verify_after_a_run_reads_recorded_balances() {
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let before = api.verify(&plan, &journal).unwrap();
    assert!(!before.ok());
    assert!(before
        .balances
        .iter()
        .all(|b| b.status == FindingStatus::Missing));
    assert!(before.live_total.is_none());

    assert!(api.run(&plan, &journal, RunMode::Commit).unwrap().ok());
    let after = api.verify(&plan, &journal).unwrap();
    assert!(after.ok(), "{:?}", after.problems());
    assert!(after.live_total.unwrap().is_balanced());
    assert!(!facts.find("verify.result", "success").is_empty());
}
