//! Crash and resume over the file-backed journal.

use tokenrail::adapters::{signer_address, SimLedger};
use tokenrail::journal::{FileJournal, Journal};
use tokenrail::types::{Address, Amount, OutcomeState, RunMode, Status};

use crate::common::{fast_policy, lethe_sim, lethe_spec, orchestrator, with_temp_root};

fn holders(sim: &SimLedger) -> Vec<Address> {
    let mut out = vec![
        sim.deployed("ICOContract")[0],
        sim.deployed("TokenLock")[0],
        signer_address("deployer"),
    ];
    for a in [
        "0x853D1955482E01b50d687fE6ce222114538BDD9C",
        "0x13b0Cd963e4aCeCaa0cA797Ad4A451c46EB75c0F",
        "0x764232Fa170D17Ae705C21Da2a43151637D3C284",
        "0xeF60dB4EC3109c35682c2dFd16588D77acB24678",
    ] {
        out.push(a.parse().unwrap());
    }
    out
}

fn balances(sim: &SimLedger) -> Vec<Amount> {
    let token = sim.deployed("Lethe")[0];
    holders(sim)
        .into_iter()
        .map(|h| sim.balance_of(token, h))
        .collect()
}

#[test]
fn interrupted_run_resumes_without_duplicates() {
    let root = with_temp_root();
    let plan = {
        let (api, _) = orchestrator(fast_policy(), &lethe_sim());
        api.plan(&lethe_spec()).unwrap()
    };

    let sim = lethe_sim();
    sim.offline_after(14);
    let (api, _) = orchestrator(fast_policy(), &sim);
    let done;
    {
        let journal = FileJournal::open(root.path(), "lethe").unwrap();
        let first = api.run(&plan, &journal, RunMode::Commit).unwrap();
        assert!(!first.ok());
        assert_eq!(first.error_id.as_deref(), Some("E_TRANSIENT"));
        assert_eq!(first.exit_code(), 50);
        done = first.confirmed().len();
        assert!(done >= 14 && done < plan.len());
    }

    sim.set_online();
    let journal = FileJournal::open(root.path(), "lethe").unwrap();
    let second = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(second.ok(), "{}", second.render());
    assert_eq!(second.already_confirmed().len(), done);
    assert!(second
        .outcomes
        .iter()
        .all(|o| o.state.is_done()));

    let ok: Vec<_> = sim.submissions().into_iter().filter(|s| s.ok).collect();
    assert_eq!(ok.len(), 22);

    let reference = lethe_sim();
    let (ref_api, _) = orchestrator(fast_policy(), &reference);
    let clean = ref_api
        .run(&plan, &tokenrail::journal::MemoryJournal::new("lethe"), RunMode::Commit)
        .unwrap();
    assert!(clean.ok());
    assert_eq!(balances(&sim), balances(&reference));
}

#[test]
fn confirmed_records_persist_across_reopen() {
    let root = with_temp_root();
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    {
        let journal = FileJournal::open(root.path(), "lethe").unwrap();
        assert!(api.run(&plan, &journal, RunMode::Commit).unwrap().ok());
    }

    let journal = FileJournal::open(root.path(), "lethe").unwrap();
    let records = journal.records().unwrap();
    assert_eq!(records.len(), plan.len());
    assert!(records.values().all(|r| r.status() == Status::Confirmed));

    let again = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(again
        .outcomes
        .iter()
        .all(|o| o.state == OutcomeState::AlreadyConfirmed));
    assert_eq!(sim.submissions().len(), 22);
}

#[test]
fn journal_for_another_campaign_is_refused() {
    let root = with_temp_root();
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = FileJournal::open(root.path(), "other").unwrap();
    let err = api.run(&plan, &journal, RunMode::Commit).unwrap_err();
    assert_eq!(err.exit_code(), 70);
    assert!(sim.submissions().is_empty());
}
