//! Construction failures never yield a partial plan.

use tokenrail::graph::PlanBuilder;
use tokenrail::types::{
    Action, ActionId, Amount, ConstructionError, FutureRef, Recipient, VestingTerms,
};
use tokenrail::Orchestrator;

use crate::common::{lethe_spec, TestAudit, TestEmitter};

#[test]
fn cycle_is_rejected_with_the_involved_actions() {
    let mut b = PlanBuilder::new("c");
    b.push(Action::deploy("a", "Token", vec![]).after("b"));
    b.push(Action::deploy("b", "Token", vec![]).after("a"));
    b.push(Action::deploy("c", "Token", vec![]));
    match b.finish() {
        Err(ConstructionError::Cycle { involved }) => {
            assert_eq!(involved, vec![ActionId::from("a"), ActionId::from("b")]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut b = PlanBuilder::new("c");
    b.push(Action::deploy("a", "Token", vec![]));
    b.push(Action::deploy("a", "Token", vec![]));
    assert_eq!(
        b.finish().unwrap_err(),
        ConstructionError::DuplicateId(ActionId::from("a"))
    );
}

#[test]
fn future_on_unknown_action_is_rejected() {
    let mut b = PlanBuilder::new("c");
    b.push(Action::call("t", FutureRef::deployed("missing"), "transfer", vec![]));
    assert!(matches!(
        b.finish(),
        Err(ConstructionError::UnknownDependency { .. })
    ));
}

#[test]
fn cliff_longer_than_duration_fails_and_is_reported() {
    let mut spec = lethe_spec();
    let team = spec
        .allocations
        .iter_mut()
        .find(|a| a.name == "TEAM")
        .unwrap();
    team.vesting = Some(VestingTerms {
        start: 0,
        cliff: 100,
        duration: 50,
        slice_interval: 10,
        revocable: false,
    });

    let facts = TestEmitter::default();
    let api = Orchestrator::new(facts.clone(), TestAudit, tokenrail::policy::Policy::default());
    let err = api.plan(&spec).unwrap_err();
    assert_eq!(err.exit_code(), 10);
    let failures = facts.find("plan", "failure");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["error_id"], serde_json::json!("E_CONSTRUCTION"));
}

#[test]
fn zero_slice_interval_fails() {
    let mut spec = lethe_spec();
    if let Some(t) = spec
        .allocations
        .iter_mut()
        .find_map(|a| a.vesting.as_mut())
    {
        t.slice_interval = 0;
    }
    assert_eq!(
        tokenrail::campaign::build(&spec).unwrap_err(),
        ConstructionError::ZeroSliceInterval("TEAM".into())
    );
}

#[test]
fn unknown_recipient_contract_fails() {
    let mut spec = lethe_spec();
    spec.allocations[0].recipient = Recipient::Contract("nowhere".into());
    spec.allocations[0].amount = Amount(1);
    assert_eq!(
        tokenrail::campaign::build(&spec).unwrap_err(),
        ConstructionError::UnknownContract("nowhere".into())
    );
}

#[test]
fn unknown_yaml_keys_are_rejected() {
    let doc = format!("{}\nsurprise: true\n", crate::common::LETHE_YAML);
    assert!(tokenrail::campaign::load_str(&doc).is_err());
}

#[test]
fn transactions_cannot_carry_expectations() {
    let mut b = PlanBuilder::new("ab");
    b.push(Action::deploy("A", "Token", vec![]));
    b.push(
        Action::call(
            "B",
            FutureRef::deployed("A"),
            "transfer",
            vec![tokenrail::adapters::signer_address("alice").into(), Amount(100).into()],
        )
        .expecting(tokenrail::types::Expectation::Equals(tokenrail::types::Value::Bool(false))),
    );
    assert!(matches!(
        b.finish(),
        Err(ConstructionError::MalformedAction { action, .. }) if action == ActionId::from("B")
    ));
}
