//! Full Lethe launch against the simulated chain.

use tokenrail::adapters::signer_address;
use tokenrail::journal::MemoryJournal;
use tokenrail::types::{ActionId, Address, Amount, FindingStatus, LogEvent, OutcomeState, RunMode};

use crate::common::{fast_policy, lethe_sim, lethe_spec, lethe_supply, orchestrator};

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

#[test]
fn lethe_commit_distributes_the_whole_supply() {
    let sim = lethe_sim();
    let (api, facts) = orchestrator(fast_policy(), &sim);
    let mut spec = lethe_spec();
    spec.deployer = Some(signer_address("deployer"));
    spec.deployer_remaining = Some(Amount::ZERO);
    let plan = api.plan(&spec).unwrap();
    let journal = MemoryJournal::new("lethe");

    let report = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(report.ok(), "{}", report.render());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.confirmed().len(), plan.len());

    let token = sim.deployed("Lethe")[0];
    let lock = sim.deployed("TokenLock")[0];
    let tokens = |n: u128| Amount::tokens(n, 18);
    assert_eq!(
        sim.balance_of(token, addr("0xeF60dB4EC3109c35682c2dFd16588D77acB24678")),
        tokens(276_000_000)
    );
    assert_eq!(
        sim.balance_of(token, addr("0x853D1955482E01b50d687fE6ce222114538BDD9C")),
        tokens(179_400_000)
    );
    assert_eq!(sim.balance_of(token, lock), tokens(69_000_000));
    assert_eq!(sim.balance_of(token, signer_address("deployer")), Amount::ZERO);

    let schedules = sim.schedules(lock);
    assert_eq!(schedules.len(), 1);
    assert_eq!(
        schedules[0].beneficiary,
        addr("0x13b0Cd963e4aCeCaa0cA797Ad4A451c46EB75c0F")
    );
    assert_eq!(schedules[0].amount, tokens(69_000_000));

    let v = report.verification.as_ref().unwrap();
    assert!(v.supply.as_ref().unwrap().is_balanced());
    assert_eq!(v.balances.len(), 6);
    assert!(v.balances.iter().all(|b| b.status == FindingStatus::Match));
    assert_eq!(v.live_total.as_ref().unwrap().distributed, lethe_supply());

    assert_eq!(facts.find("run.result", "success").len(), 1);
    assert_eq!(facts.find("verify.result", "success").len(), 1);
}

#[test]
fn vesting_transfer_is_confirmed_before_schedule_submission() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");
    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(r.ok(), "{}", r.render());

    let confirmed = r
        .seq_of(&ActionId::from("transfer_TEAM_5"), |e| {
            matches!(e, LogEvent::Confirmed)
        })
        .unwrap();
    let submitted = r
        .seq_of(&ActionId::from("vesting_TEAM_5"), |e| {
            matches!(e, LogEvent::Submitted { .. })
        })
        .unwrap();
    assert!(confirmed < submitted);
}

#[test]
fn every_action_is_reported_once_in_builder_order() {
    let sim = lethe_sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = api.plan(&lethe_spec()).unwrap();
    let journal = MemoryJournal::new("lethe");
    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    let ids: Vec<_> = r.outcomes.iter().map(|o| o.id.clone()).collect();
    assert_eq!(ids, plan.ids().cloned().collect::<Vec<_>>());
    assert!(r
        .outcomes
        .iter()
        .all(|o| o.state == OutcomeState::Confirmed));
    assert!(r.render().contains("PASS"));
}
