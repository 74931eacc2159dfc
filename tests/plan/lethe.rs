//! Shape of the Lethe campaign plan.

use tokenrail::graph::schedule;
use tokenrail::types::ids::plan_id;
use tokenrail::types::{ActionId, ActionKind};
use tokenrail::Orchestrator;

use crate::common::{lethe_spec, TestAudit, TestEmitter};

fn id(s: &str) -> ActionId {
    ActionId::from(s)
}

#[test]
fn lethe_plan_has_expected_actions() {
    let plan = tokenrail::campaign::build(&lethe_spec()).unwrap();
    let count = |k: ActionKind| plan.actions().iter().filter(|a| a.kind == k).count();
    assert_eq!(count(ActionKind::Deploy), 4);
    // 6 whitelist + 10 transfers + 1 vesting schedule + 1 follow-up
    assert_eq!(count(ActionKind::Call), 18);
    // 10 per-allocation checks + 6 distinct holders
    assert_eq!(count(ActionKind::StaticCall), 16);
    assert_eq!(plan.calls_to("transfer").count(), 10);
    assert!(plan.action(&id("transfer_TREASURY_9")).is_some());
    assert!(plan.action(&id("whitelist_5")).is_some());
}

#[test]
fn whitelisting_a_repeated_recipient_collapses_to_one_call() {
    let plan = tokenrail::campaign::build(&lethe_spec()).unwrap();
    // Three allocations go to 0xeF60.. and three to 0x853D.., yet each holder is whitelisted once.
    assert_eq!(plan.calls_to("addToWhitelist").count(), 6);
    for t in ["transfer_ECOSYSTEM_7", "transfer_COMMUNITY_8", "transfer_TREASURY_9"] {
        assert!(plan.action(&id(t)).unwrap().depends_on.contains(&id("whitelist_5")));
    }
}

#[test]
fn vested_allocation_goes_through_the_lock() {
    let plan = tokenrail::campaign::build(&lethe_spec()).unwrap();
    let vesting = plan.action(&id("vesting_TEAM_5")).unwrap();
    assert!(vesting.depends_on.contains(&id("transfer_TEAM_5")));
    assert!(vesting.depends_on.contains(&id("deploy_lock_3")));
    let verify = plan.action(&id("verify_TEAM_5")).unwrap();
    assert!(verify.depends_on.contains(&id("vesting_TEAM_5")));

    let order = schedule(&plan);
    let pos = |s: &str| {
        let p = plan.position(&id(s)).unwrap();
        order.iter().position(|&i| i == p).unwrap()
    };
    assert!(pos("transfer_TEAM_5") < pos("vesting_TEAM_5"));
    assert!(pos("vesting_TEAM_5") < pos("verify_TEAM_5"));
}

#[test]
fn building_twice_is_deterministic() {
    let a = tokenrail::campaign::build(&lethe_spec()).unwrap();
    let b = tokenrail::campaign::build(&lethe_spec()).unwrap();
    assert_eq!(a.ids().collect::<Vec<_>>(), b.ids().collect::<Vec<_>>());
    assert_eq!(a.edges(), b.edges());
    assert_eq!(plan_id(&a), plan_id(&b));
    assert_eq!(schedule(&a), schedule(&b));
}

#[test]
fn plan_emits_a_fact() {
    let facts = TestEmitter::default();
    let api = Orchestrator::new(facts.clone(), TestAudit, tokenrail::policy::Policy::default());
    let plan = api.plan(&lethe_spec()).unwrap();
    let ok = facts.find("plan", "success");
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0]["actions"], serde_json::json!(plan.len()));
    assert_eq!(ok[0]["campaign"], serde_json::json!("lethe"));
    assert_eq!(ok[0]["plan_id"], serde_json::json!(plan_id(&plan).to_string()));
}
