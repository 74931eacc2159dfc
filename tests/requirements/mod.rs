//! Cross-cutting guarantees: determinism, redaction, exit codes, policy presets.

use tokenrail::api::errors::{exit_code_for, ErrorId};
use tokenrail::journal::MemoryJournal;
use tokenrail::policy::Policy;
use tokenrail::types::{plan_id, to_yaml, RunMode};

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator};

#[test]
fn same_campaign_yields_the_same_plan_id() {
    let (api, _) = orchestrator(fast_policy(), &lethe_sim());
    let a = api.plan(&lethe_spec()).unwrap();
    let b = api.plan(&lethe_spec()).unwrap();
    assert_eq!(plan_id(&a), plan_id(&b));

    let mut changed = lethe_spec();
    changed.allocations[0].amount.0 += 1;
    let c = api.plan(&changed).unwrap();
    assert_ne!(plan_id(&a), plan_id(&c));
}

#[test]
fn dry_run_masks_run_ids() {
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let before = facts.all().len();
    api.run(&plan, &MemoryJournal::new("lethe"), RunMode::DryRun)
        .unwrap();
    let run_facts = facts.all().split_off(before);
    assert!(run_facts
        .iter()
        .filter_map(|f| f.get("run_id"))
        .all(|id| id == "***"));
}

#[test]
fn exit_codes_are_stable() {
    assert_eq!(exit_code_for(ErrorId::E_CONSTRUCTION), 10);
    assert_eq!(exit_code_for(ErrorId::E_SUPPLY_MISMATCH), 20);
    assert_eq!(exit_code_for(ErrorId::E_LOCKING), 30);
    assert_eq!(exit_code_for(ErrorId::E_REJECTED), 40);
    assert_eq!(exit_code_for(ErrorId::E_TRANSIENT), 50);
    assert_eq!(exit_code_for(ErrorId::E_UNRESOLVED), 60);
    assert_eq!(exit_code_for(ErrorId::E_JOURNAL), 70);
    assert_eq!(exit_code_for(ErrorId::E_IN_DOUBT), 80);
    assert_eq!(exit_code_for(ErrorId::E_VERIFY), 90);
}

#[test]
fn production_preset_refuses_unlocked_commits() {
    let sim = lethe_sim();
    let mut policy = Policy::production_preset();
    policy.retry.backoff_base_ms = 0;
    let (api, _) = orchestrator(policy, &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    assert_eq!(r.exit_code(), 30);
    assert!(sim.submissions().is_empty());
}

#[test]
fn report_serializes_to_yaml() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    let y = to_yaml(&r);
    assert!(y.contains("campaign: lethe"));
    assert!(y.contains("transfer_TEAM_5"));
}

#[test]
fn commit_without_a_ledger_is_refused() {
    let api = tokenrail::Orchestrator::new(
        crate::common::TestEmitter::default(),
        crate::common::TestAudit,
        fast_policy(),
    );
    let plan = api.plan(&lethe_spec()).unwrap();
    let err = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap_err();
    assert!(matches!(err, tokenrail::api::errors::ApiError::LedgerMissing));
    assert_eq!(err.exit_code(), 1);
}
