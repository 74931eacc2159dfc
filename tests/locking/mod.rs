//! Commit runs are serialized by a process lock.

use tokenrail::adapters::{FileLockManager, LockManager};
use tokenrail::journal::MemoryJournal;
use tokenrail::policy::LockingPolicy;
use tokenrail::types::RunMode;

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator, with_temp_root};

#[test]
fn required_lock_without_manager_fails_closed() {
    let sim = lethe_sim();
    let mut policy = fast_policy();
    policy.governance.locking = LockingPolicy::Required;
    let (api, facts) = orchestrator(policy, &sim);
    let plan = api.plan(&lethe_spec()).unwrap();

    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    assert_eq!(r.error_id.as_deref(), Some("E_LOCKING"));
    assert_eq!(r.exit_code(), 30);
    assert!(sim.submissions().is_empty());
    let attempt = facts.find("run.attempt", "failure");
    assert_eq!(attempt.len(), 1);
    assert_eq!(attempt[0]["error_id"], "E_LOCKING");
}

#[test]
fn dry_run_needs_no_lock() {
    let sim = lethe_sim();
    let mut policy = fast_policy();
    policy.governance.locking = LockingPolicy::Required;
    let (api, _) = orchestrator(policy, &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::DryRun)
        .unwrap();
    assert!(r.ok(), "{}", r.render());
}

#[test]
fn held_lock_times_out() {
    let root = with_temp_root();
    let holder = FileLockManager::for_campaign(root.path(), "lethe");
    let _held = holder.acquire_process_lock(1_000).unwrap();

    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let api = api
        .with_lock_manager(Box::new(FileLockManager::for_campaign(root.path(), "lethe")))
        .with_lock_timeout_ms(100);
    let plan = api.plan(&lethe_spec()).unwrap();

    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    assert_eq!(r.error_id.as_deref(), Some("E_LOCKING"));
    assert!(sim.submissions().is_empty());
    let attempt = facts.find("run.attempt", "failure");
    assert_eq!(attempt[0]["lock_backend"], "file");
}

#[test]
fn free_lock_is_taken_and_released() {
    let root = with_temp_root();
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let api = api.with_lock_manager(Box::new(FileLockManager::for_campaign(root.path(), "lethe")));
    let plan = api.plan(&lethe_spec()).unwrap();
    let r = api
        .run(&plan, &MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    assert!(r.ok(), "{}", r.render());
    assert_eq!(facts.find("run.attempt", "success")[0]["lock_backend"], "file");

    let again = FileLockManager::for_campaign(root.path(), "lethe");
    assert!(again.acquire_process_lock(100).is_ok());
}
