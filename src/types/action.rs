use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::{Amount, Value};

/// Stable, human-assignable action identifier; the journal key and the unit of idempotence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Deploy,
    Call,
    StaticCall,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Deploy => "deploy",
            ActionKind::Call => "call",
            ActionKind::StaticCall => "static_call",
        }
    }

    /// Whether dispatching this kind consumes a signer sequence number.
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        !matches!(self, ActionKind::StaticCall)
    }
}

/// Placeholder for a value produced by another action. Holds no value itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureRef {
    /// Address produced by confirming a `Deploy` action.
    Deployed(ActionId),
    /// The `index`-th result value of a confirmed action.
    Output { action: ActionId, index: usize },
}

impl FutureRef {
    pub fn deployed(action: impl Into<ActionId>) -> Self {
        FutureRef::Deployed(action.into())
    }

    pub fn output(action: impl Into<ActionId>, index: usize) -> Self {
        FutureRef::Output {
            action: action.into(),
            index,
        }
    }

    /// The action whose confirmation this reference waits on.
    #[must_use]
    pub const fn producer(&self) -> &ActionId {
        match self {
            FutureRef::Deployed(a) | FutureRef::Output { action: a, .. } => a,
        }
    }
}

impl fmt::Display for FutureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureRef::Deployed(a) => write!(f, "<address of {a}>"),
            FutureRef::Output { action, index } => write!(f, "<output {index} of {action}>"),
        }
    }
}

/// One argument slot: a literal or a reference resolved at dispatch time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    Literal(Value),
    Future(FutureRef),
}

impl Arg {
    #[must_use]
    pub const fn future(&self) -> Option<&FutureRef> {
        match self {
            Arg::Future(f) => Some(f),
            Arg::Literal(_) => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Literal(v) => write!(f, "{v}"),
            Arg::Future(r) => write!(f, "{r}"),
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Literal(v)
    }
}

impl From<FutureRef> for Arg {
    fn from(f: FutureRef) -> Self {
        Arg::Future(f)
    }
}

impl From<super::value::Address> for Arg {
    fn from(a: super::value::Address) -> Self {
        Arg::Literal(Value::Address(a))
    }
}

impl From<Amount> for Arg {
    fn from(a: Amount) -> Self {
        Arg::Literal(Value::Uint(a.0))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Instantiate a contract of the given type; constructor arguments live in `Action::args`.
    Deploy { contract: String },
    /// Invoke `method` on a deployed instance.
    Invoke { instance: Arg, method: String },
}

/// In-line assertion checked against a confirmed result before recording it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Result value 0 is a uint of at least this amount.
    BalanceAtLeast(Amount),
    /// Result value 0 equals this value.
    Equals(Value),
}

impl Expectation {
    /// Check a result; returns a human message describing the violation.
    pub fn check(&self, values: &[Value]) -> Result<(), String> {
        let first = values.first();
        match self {
            Expectation::BalanceAtLeast(min) => match first.and_then(Value::as_uint) {
                Some(v) if v >= min.0 => Ok(()),
                Some(v) => Err(format!("balance {v} below expected minimum {min}")),
                None => Err("expected a uint balance result".to_string()),
            },
            Expectation::Equals(want) => match first {
                Some(v) if v == want => Ok(()),
                Some(v) => Err(format!("expected {want}, observed {v}")),
                None => Err(format!("expected {want}, observed no value")),
            },
        }
    }
}

/// An atomic unit of on-chain work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub kind: ActionKind,
    pub target: Target,
    pub args: Vec<Arg>,
    /// Explicit edges as authored; implicit future edges are folded in when the plan is built.
    pub depends_on: BTreeSet<ActionId>,
    /// Signing identity for transactions. `None` on reads and for the default signer.
    pub signer: Option<String>,
    pub expect: Option<Expectation>,
    pub label: String,
}

impl Action {
    pub fn deploy(id: impl Into<ActionId>, contract: impl Into<String>, args: Vec<Arg>) -> Self {
        let contract = contract.into();
        Self {
            id: id.into(),
            kind: ActionKind::Deploy,
            label: format!("deploy {contract}"),
            target: Target::Deploy { contract },
            args,
            depends_on: BTreeSet::new(),
            signer: None,
            expect: None,
        }
    }

    pub fn call(
        id: impl Into<ActionId>,
        instance: impl Into<Arg>,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> Self {
        Self::invoke(ActionKind::Call, id.into(), instance.into(), method.into(), args)
    }

    pub fn static_call(
        id: impl Into<ActionId>,
        instance: impl Into<Arg>,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> Self {
        Self::invoke(
            ActionKind::StaticCall,
            id.into(),
            instance.into(),
            method.into(),
            args,
        )
    }

    fn invoke(kind: ActionKind, id: ActionId, instance: Arg, method: String, args: Vec<Arg>) -> Self {
        Self {
            id,
            kind,
            label: format!("{method} on {instance}"),
            target: Target::Invoke { instance, method },
            args,
            depends_on: BTreeSet::new(),
            signer: None,
            expect: None,
        }
    }

    /// Add an explicit ordering edge.
    #[must_use]
    pub fn after(mut self, id: impl Into<ActionId>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    #[must_use]
    pub fn signed_by(mut self, signer: impl Into<String>) -> Self {
        self.signer = Some(signer.into());
        self
    }

    #[must_use]
    pub fn expecting(mut self, expect: Expectation) -> Self {
        self.expect = Some(expect);
        self
    }

    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match &self.target {
            Target::Invoke { method, .. } => Some(method),
            Target::Deploy { .. } => None,
        }
    }

    /// Every future referenced by the target or the arguments.
    pub fn futures(&self) -> impl Iterator<Item = &FutureRef> {
        let target = match &self.target {
            Target::Invoke { instance, .. } => instance.future(),
            Target::Deploy { .. } => None,
        };
        target
            .into_iter()
            .chain(self.args.iter().filter_map(Arg::future))
    }

    /// Dependencies implied by futures in the target or arguments.
    #[must_use]
    pub fn implicit_dependencies(&self) -> BTreeSet<ActionId> {
        self.futures().map(|f| f.producer().clone()).collect()
    }
}
