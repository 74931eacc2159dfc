//! Shared test helpers for the tokenrail integration tests.
#![allow(dead_code)]

use log::Level;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use tokenrail::adapters::{SimKind, SimLedger};
use tokenrail::campaign;
use tokenrail::logging::{AuditSink, FactsEmitter};
use tokenrail::policy::Policy;
use tokenrail::types::{Amount, CampaignSpec};
use tokenrail::Orchestrator;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Fields of every fact with the given event name and decision.
    pub fn find(&self, event: &str, decision: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, d, _)| e == event && d == decision)
            .map(|(_, _, _, f)| f.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, _, f)| f.clone())
            .collect()
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

pub const LETHE_YAML: &str = include_str!("fixtures/lethe.yaml");

pub fn lethe_spec() -> CampaignSpec {
    campaign::load_str(LETHE_YAML).expect("fixture parses")
}

pub fn lethe_supply() -> Amount {
    Amount::tokens(690_000_000, 18)
}

/// Simulated chain with the four Lethe contract types registered.
pub fn lethe_sim() -> Arc<SimLedger> {
    let sim = SimLedger::new();
    sim.register("LetheWhitelist", SimKind::Whitelist);
    sim.register(
        "Lethe",
        SimKind::Token {
            supply: lethe_supply(),
            gated_by_arg: Some(0),
        },
    );
    sim.register("ICOContract", SimKind::Generic);
    sim.register("TokenLock", SimKind::Vesting { token_arg: 0 });
    Arc::new(sim)
}

/// Default policy without backoff sleeps.
pub fn fast_policy() -> Policy {
    let mut p = Policy::default();
    p.retry.backoff_base_ms = 0;
    p.retry.backoff_max_ms = 0;
    p
}

pub fn orchestrator(
    policy: Policy,
    sim: &Arc<SimLedger>,
) -> (Orchestrator<TestEmitter, TestAudit>, TestEmitter) {
    let facts = TestEmitter::default();
    let api = Orchestrator::new(facts.clone(), TestAudit, policy).with_ledger(sim.clone());
    (api, facts)
}

/// Create a temporary root directory for journals and lock files.
pub fn with_temp_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}
