use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::{ActionId, ActionKind};
use super::plan::RunMode;
use super::value::{Amount, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyDelta {
    Balanced,
    Shortfall(Amount),
    Excess(Amount),
}

/// Distributed total compared against the campaign's fixed expected total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCheck {
    pub expected: Amount,
    pub distributed: Amount,
    pub delta: SupplyDelta,
    /// Names of the allocations (or recipients, for live checks) that were summed.
    pub allocations: Vec<String>,
}

impl SupplyCheck {
    #[must_use]
    pub fn new(expected: Amount, distributed: Amount, allocations: Vec<String>) -> Self {
        let delta = if distributed == expected {
            SupplyDelta::Balanced
        } else if distributed < expected {
            SupplyDelta::Shortfall(expected.abs_diff(distributed))
        } else {
            SupplyDelta::Excess(distributed.abs_diff(expected))
        };
        Self {
            expected,
            distributed,
            delta,
            allocations,
        }
    }

    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        matches!(self.delta, SupplyDelta::Balanced)
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self.delta {
            SupplyDelta::Balanced => format!("distributed {} equals expected total", self.distributed),
            SupplyDelta::Shortfall(d) => format!(
                "shortfall of {d}: distributed {} of expected {} across [{}]",
                self.distributed,
                self.expected,
                self.allocations.join(", ")
            ),
            SupplyDelta::Excess(d) => format!(
                "excess of {d}: distributed {} over expected {} across [{}]",
                self.distributed,
                self.expected,
                self.allocations.join(", ")
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Match,
    Mismatch,
    /// The balance read has no confirmed result.
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceFinding {
    pub action: ActionId,
    pub recipient: String,
    pub expected: Amount,
    pub observed: Option<Amount>,
    pub allocations: Vec<String>,
    pub status: FindingStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Static sum of allocation amounts; `None` when the plan declares no expected total.
    pub supply: Option<SupplyCheck>,
    /// Per-recipient live balances read from the journal.
    pub balances: Vec<BalanceFinding>,
    /// Sum of observed recipient balances against the expected total.
    pub live_total: Option<SupplyCheck>,
}

impl VerificationReport {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.supply.as_ref().map_or(true, SupplyCheck::is_balanced)
            && self.live_total.as_ref().map_or(true, SupplyCheck::is_balanced)
            && self
                .balances
                .iter()
                .all(|b| b.status == FindingStatus::Match)
    }

    /// Human-readable diagnostics, one line per problem.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(s) = self.supply.as_ref().filter(|s| !s.is_balanced()) {
            out.push(format!("supply pre-check: {}", s.describe()));
        }
        for b in &self.balances {
            match b.status {
                FindingStatus::Match => {}
                FindingStatus::Mismatch => out.push(format!(
                    "balance of {} is {} but allocations [{}] expect {}",
                    b.recipient,
                    b.observed.unwrap_or_default(),
                    b.allocations.join(", "),
                    b.expected
                )),
                FindingStatus::Missing => out.push(format!(
                    "balance of {} was never read ({} not confirmed)",
                    b.recipient, b.action
                )),
            }
        }
        if let Some(s) = self.live_total.as_ref().filter(|s| !s.is_balanced()) {
            out.push(format!("live total: {}", s.describe()));
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    /// Submitted and confirmed during this run.
    Confirmed,
    /// Found confirmed in the journal; not submitted again.
    AlreadyConfirmed,
    Failed,
    /// Left `Submitted` by an earlier run; its on-chain fate is unknown.
    InDoubt,
    NotAttempted,
    /// Dry run: would be dispatched.
    WouldSubmit,
}

impl OutcomeState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutcomeState::Confirmed => "confirmed",
            OutcomeState::AlreadyConfirmed => "already_confirmed",
            OutcomeState::Failed => "failed",
            OutcomeState::InDoubt => "in_doubt",
            OutcomeState::NotAttempted => "not_attempted",
            OutcomeState::WouldSubmit => "would_submit",
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, OutcomeState::Confirmed | OutcomeState::AlreadyConfirmed)
    }
}

/// Terminal state of one action after a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub id: ActionId,
    pub kind: ActionKind,
    pub label: String,
    pub state: OutcomeState,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    Skipped,
    Submitted { attempt: u32 },
    Retrying { attempt: u32, error: String },
    Confirmed,
    Failed { error: String },
}

/// Ordered submission log; `seq` is strictly increasing across the whole run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub action: ActionId,
    pub event: LogEvent,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub campaign: String,
    pub plan_uuid: Option<Uuid>,
    pub run_id: String,
    pub mode: RunMode,
    /// One entry per plan action, in builder order.
    pub outcomes: Vec<ActionOutcome>,
    pub log: Vec<LogEntry>,
    pub verification: Option<VerificationReport>,
    pub errors: Vec<String>,
    pub error_id: Option<String>,
    pub duration_ms: u64,
}

impl RunReport {
    /// True when nothing failed and, in commit mode, every action is confirmed and
    /// verification (if performed) passed.
    #[must_use]
    pub fn ok(&self) -> bool {
        if !self.errors.is_empty() || self.error_id.is_some() {
            return false;
        }
        if self.verification.as_ref().is_some_and(|v| !v.ok()) {
            return false;
        }
        match self.mode {
            RunMode::DryRun => true,
            RunMode::Commit => self.outcomes.iter().all(|o| o.state.is_done()),
        }
    }

    /// Process exit status: 0 on success, the error id's code otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.ok() {
            return 0;
        }
        self.error_id
            .as_deref()
            .and_then(crate::api::errors::exit_code_for_id_str)
            .unwrap_or(1)
    }

    #[must_use]
    pub fn outcome(&self, id: &ActionId) -> Option<&ActionOutcome> {
        self.outcomes.iter().find(|o| &o.id == id)
    }

    fn ids_in(&self, state: OutcomeState) -> Vec<&ActionId> {
        self.outcomes
            .iter()
            .filter(|o| o.state == state)
            .map(|o| &o.id)
            .collect()
    }

    #[must_use]
    pub fn confirmed(&self) -> Vec<&ActionId> {
        self.ids_in(OutcomeState::Confirmed)
    }

    #[must_use]
    pub fn already_confirmed(&self) -> Vec<&ActionId> {
        self.ids_in(OutcomeState::AlreadyConfirmed)
    }

    #[must_use]
    pub fn failed(&self) -> Vec<&ActionId> {
        self.ids_in(OutcomeState::Failed)
    }

    #[must_use]
    pub fn not_attempted(&self) -> Vec<&ActionId> {
        self.ids_in(OutcomeState::NotAttempted)
    }

    /// Actions with at least one `Submitted` log entry during this run, in log order.
    #[must_use]
    pub fn submitted(&self) -> Vec<&ActionId> {
        let mut out: Vec<&ActionId> = Vec::new();
        for e in &self.log {
            if matches!(e.event, LogEvent::Submitted { .. }) && !out.contains(&&e.action) {
                out.push(&e.action);
            }
        }
        out
    }

    /// Sequence number of the first log entry for `id` matching `pred`.
    pub fn seq_of(&self, id: &ActionId, pred: impl Fn(&LogEvent) -> bool) -> Option<u64> {
        self.log
            .iter()
            .find(|e| &e.action == id && pred(&e.event))
            .map(|e| e.seq)
    }

    /// Operator-facing report enumerating every action's final state.
    #[must_use]
    pub fn render(&self) -> String {
        let mut s = String::new();
        let mode = match self.mode {
            RunMode::DryRun => "dry-run",
            RunMode::Commit => "commit",
        };
        let _ = writeln!(
            s,
            "campaign {} ({mode}) run {}: {}",
            self.campaign,
            self.run_id,
            if self.ok() { "PASS" } else { "FAIL" }
        );
        for o in &self.outcomes {
            let _ = write!(s, "  [{:<17}] {:<32} {}", o.state.as_str(), o.id, o.label);
            if o.attempts > 1 {
                let _ = write!(s, " (attempts: {})", o.attempts);
            }
            if let Some(e) = &o.error {
                let _ = write!(s, " -- {e}");
            }
            s.push('\n');
        }
        if let Some(v) = &self.verification {
            for p in v.problems() {
                let _ = writeln!(s, "  verify: {p}");
            }
        }
        for e in &self.errors {
            let _ = writeln!(s, "  error: {e}");
        }
        if let Some(id) = &self.error_id {
            let _ = writeln!(s, "  error_id: {id} (exit {})", self.exit_code());
        }
        s
    }
}

/// Render a run report as YAML for artifacts and fixtures.
#[must_use]
pub fn to_yaml(report: &RunReport) -> String {
    serde_yaml::to_string(report).unwrap_or_else(|_| "{}\n".to_string())
}
