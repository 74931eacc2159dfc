//! `A = Deploy(Token)`, `B = Call(A.transfer, [recipient, 100])`: a second run
//! over the same journal submits nothing.

use tokenrail::adapters::{signer_address, SimKind, SimLedger};
use tokenrail::graph::PlanBuilder;
use tokenrail::journal::{Journal, MemoryJournal};
use tokenrail::types::{
    Action, ActionId, Amount, FutureRef, LogEvent, OutcomeState, Plan, RunMode, Status, Value,
};
use std::sync::Arc;

use crate::common::{fast_policy, orchestrator};

fn plan(recipient: tokenrail::types::Address) -> Plan {
    let mut b = PlanBuilder::new("ab");
    b.push(Action::deploy("A", "Token", vec![]));
    b.push(
        Action::call(
            "B",
            FutureRef::deployed("A"),
            "transfer",
            vec![recipient.into(), Amount(100).into()],
        )
        .after("A"),
    );
    b.finish().unwrap()
}

fn sim() -> Arc<SimLedger> {
    let sim = SimLedger::new();
    sim.register(
        "Token",
        SimKind::Token {
            supply: Amount(1_000),
            gated_by_arg: None,
        },
    );
    Arc::new(sim)
}

#[test]
fn second_run_submits_nothing() {
    let sim = sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let alice = signer_address("alice");
    let plan = plan(alice);
    let journal = MemoryJournal::new("ab");

    let first = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(first.ok(), "{}", first.render());
    assert_eq!(first.confirmed(), vec![&ActionId::from("A"), &ActionId::from("B")]);
    assert_eq!(sim.submissions().len(), 2);

    let token = sim.deployed("Token")[0];
    assert_eq!(sim.balance_of(token, alice), Amount(100));
    let rec = journal.get(&ActionId::from("A")).unwrap().unwrap();
    assert_eq!(rec.status(), Status::Confirmed);
    assert_eq!(rec.result(), Some(&[Value::Address(token)][..]));

    let second = api.run(&plan, &journal, RunMode::Commit).unwrap();
    assert!(second.ok());
    assert_eq!(sim.submissions().len(), 2, "nothing re-submitted");
    assert!(second.submitted().is_empty());
    assert_eq!(
        second.already_confirmed(),
        vec![&ActionId::from("A"), &ActionId::from("B")]
    );
    assert!(second
        .log
        .iter()
        .all(|e| matches!(e.event, LogEvent::Skipped)));
    assert_eq!(sim.balance_of(token, alice), Amount(100));
}

#[test]
fn dependency_is_confirmed_before_the_dependent_is_submitted() {
    let sim = sim();
    let (api, _) = orchestrator(fast_policy(), &sim);
    let plan = plan(signer_address("bob"));
    let journal = MemoryJournal::new("ab");
    let r = api.run(&plan, &journal, RunMode::Commit).unwrap();
    let a_done = r
        .seq_of(&ActionId::from("A"), |e| matches!(e, LogEvent::Confirmed))
        .unwrap();
    let b_sent = r
        .seq_of(&ActionId::from("B"), |e| matches!(e, LogEvent::Submitted { .. }))
        .unwrap();
    assert!(a_done < b_sent);
    assert_eq!(r.outcome(&ActionId::from("B")).unwrap().state, OutcomeState::Confirmed);
}
