//! Records an interrupted run left in `Submitted`.

use tokenrail::journal::{Journal, MemoryJournal};
use tokenrail::policy::InDoubtPolicy;
use tokenrail::types::{ActionId, ExecutionRecord, OutcomeState, RunMode};

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator};

fn seeded() -> MemoryJournal {
    let journal = MemoryJournal::new("lethe");
    journal
        .put(
            &ActionId::from("deploy_whitelist_0"),
            ExecutionRecord::submitted(1),
        )
        .unwrap();
    journal
}

#[test]
fn in_doubt_record_halts_before_any_submission() {
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = seeded();

    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert_eq!(r.error_id.as_deref(), Some("E_IN_DOUBT"));
    assert_eq!(r.exit_code(), 80);
    assert!(sim.submissions().is_empty());
    assert_eq!(
        r.outcome(&ActionId::from("deploy_whitelist_0")).unwrap().state,
        OutcomeState::InDoubt
    );
    assert_eq!(r.not_attempted().len(), plan.len() - 1);
    let failures = facts.find("action.result", "failure");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["error_id"], "E_IN_DOUBT");
}

#[test]
fn dry_run_surfaces_in_doubt_records() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let r = api.run(&plan, &seeded(), RunMode::DryRun).unwrap();
    assert_eq!(r.error_id.as_deref(), Some("E_IN_DOUBT"));
}

#[test]
fn resubmit_policy_dispatches_the_action_again() {
    let sim = lethe_sim();
    let mut policy = fast_policy();
    policy.execution.in_doubt = InDoubtPolicy::Resubmit;
    let (api, _) = orchestrator(policy, &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = seeded();

    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(r.ok(), "{}", r.render());
    let rec = journal
        .get(&ActionId::from("deploy_whitelist_0"))
        .unwrap()
        .unwrap();
    assert!(rec.is_confirmed());
    assert_eq!(rec.attempts(), 2);
}
