//! Transient faults are retried; rejections stop the run or its dependents.

use tokenrail::adapters::FaultKind;
use tokenrail::journal::{Journal, MemoryJournal};
use tokenrail::policy::FailurePolicy;
use tokenrail::types::{ActionId, OutcomeState, RunMode, Status};

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator};

#[test]
fn transient_fault_is_retried_within_the_run() {
    let sim = lethe_sim();
    sim.fail_next("addToWhitelist", FaultKind::Transient, 2);
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(r.ok(), "{}", r.render());
    let first_wl = r.outcome(&ActionId::from("whitelist_0")).unwrap();
    assert_eq!(first_wl.attempts, 3);
    assert_eq!(sim.submissions().iter().filter(|s| s.ok).count(), 22);
}

#[test]
fn rejection_halts_and_leaves_dependents_unattempted() {
    let sim = lethe_sim();
    sim.fail_next("transfer", FaultKind::Reject, 1);
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(!r.ok());
    assert_eq!(r.error_id.as_deref(), Some("E_REJECTED"));
    assert_eq!(r.exit_code(), 40);
    let failed = ActionId::from("transfer_ICO_0");
    assert_eq!(r.failed(), vec![&failed]);
    for id in ["verify_ICO_0", "transfer_STRATEGIC_INVEST_1", "call_start_ico_0"] {
        assert_eq!(
            r.outcome(&ActionId::from(id)).unwrap().state,
            OutcomeState::NotAttempted,
            "{id}"
        );
    }
    let rec = journal.get(&failed).unwrap().unwrap();
    assert_eq!(rec.status(), Status::Failed);
    assert_eq!(rec.error_id(), Some("E_REJECTED"));

    let result = facts.find("run.result", "failure");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0]["error_id"], "E_REJECTED");
    assert_eq!(result[0]["exit_code"], 40);
}

#[test]
fn failed_action_is_retried_by_the_next_run() {
    let sim = lethe_sim();
    sim.fail_next("transfer", FaultKind::Reject, 1);
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let first = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(!first.ok());
    let second = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(second.ok(), "{}", second.render());
    assert_eq!(
        second.outcome(&ActionId::from("transfer_ICO_0")).unwrap().state,
        OutcomeState::Confirmed
    );
    assert_eq!(sim.submissions().iter().filter(|s| s.ok).count(), 22);
}

#[test]
fn continue_independent_runs_unrelated_branches() {
    let sim = lethe_sim();
    sim.fail_next("transfer", FaultKind::Reject, 1);
    let mut policy = fast_policy();
    policy.execution.on_failure = FailurePolicy::ContinueIndependent;
    let (api, _) = orchestrator(policy, &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");

    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert_eq!(r.error_id.as_deref(), Some("E_REJECTED"));
    let state = |id: &str| r.outcome(&ActionId::from(id)).unwrap().state;
    assert_eq!(state("transfer_ICO_0"), OutcomeState::Failed);
    assert_eq!(state("verify_ICO_0"), OutcomeState::NotAttempted);
    assert_eq!(state("call_start_ico_0"), OutcomeState::NotAttempted);
    assert_eq!(state("transfer_TREASURY_9"), OutcomeState::Confirmed);
    assert_eq!(state("vesting_TEAM_5"), OutcomeState::Confirmed);
    assert!(r.verification.as_ref().map_or(true, |v| v.balances.is_empty()));
}
