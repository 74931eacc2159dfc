//! In-memory ledger simulating the contracts a distribution campaign touches:
//! a supply-minting token with optional whitelist gating, the whitelist itself,
//! and a vesting escrow. Used by tests and demos; supports fault injection.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha256};

use super::ledger::{Ledger, LedgerError, Receipt};
use crate::types::campaign::VestingTerms;
use crate::types::value::{Address, Amount, Value};

/// Behaviour attached to a contract type name at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimKind {
    /// Mints `supply` to the deploying signer. When `gated_by_arg` is set, that
    /// constructor argument is the whitelist contract recipients must be on.
    Token {
        supply: Amount,
        gated_by_arg: Option<usize>,
    },
    Whitelist,
    /// Escrow for vesting schedules; constructor argument `token_arg` is the token.
    Vesting { token_arg: usize },
    /// Accepts any call and returns nothing.
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Transient,
    Timeout,
    Reject,
}

#[derive(Debug, Clone)]
struct Fault {
    /// Method name, or contract type for deploys.
    selector: String,
    kind: FaultKind,
    remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VestingSchedule {
    pub beneficiary: Address,
    pub start: u64,
    pub cliff: u64,
    pub duration: u64,
    pub slice_interval: u64,
    pub revocable: bool,
    pub amount: Amount,
}

impl VestingSchedule {
    #[must_use]
    pub fn terms(&self) -> VestingTerms {
        VestingTerms {
            start: self.start,
            cliff: self.cliff,
            duration: self.duration,
            slice_interval: self.slice_interval,
            revocable: self.revocable,
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    Token {
        balances: BTreeMap<Address, u128>,
        whitelist: Option<Address>,
    },
    Whitelist {
        members: BTreeSet<Address>,
    },
    Vesting {
        token: Address,
        schedules: Vec<VestingSchedule>,
    },
    Generic,
}

#[derive(Debug, Clone)]
struct Contract {
    owner: Address,
    state: State,
}

/// One state-changing submission that reached the simulated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub signer: String,
    pub nonce: u64,
    /// Contract type for deploys, method name for calls.
    pub what: String,
    pub ok: bool,
}

#[derive(Debug, Default)]
struct Inner {
    kinds: BTreeMap<String, SimKind>,
    contracts: BTreeMap<Address, Contract>,
    deploy_order: Vec<(String, Address)>,
    nonces: BTreeMap<String, u64>,
    faults: Vec<Fault>,
    submissions: Vec<Submission>,
    reads: u64,
    offline_after: Option<usize>,
    in_flight: BTreeMap<String, usize>,
    in_flight_total: usize,
    max_in_flight_total: usize,
    signer_conflicts: u64,
}

#[derive(Debug, Default)]
pub struct SimLedger {
    inner: Mutex<Inner>,
    latency_ms: u64,
}

/// Deterministic address for a signer label.
#[must_use]
pub fn signer_address(signer: &str) -> Address {
    let digest = Sha256::digest(format!("signer:{signer}").as_bytes());
    let mut a = [0u8; 20];
    a.copy_from_slice(&digest[..20]);
    Address::from_bytes(a)
}

fn tx_digest(signer: &Address, nonce: u64) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(signer.as_bytes());
    h.update(nonce.to_be_bytes());
    h.finalize().into()
}

fn rejected(msg: impl Into<String>) -> LedgerError {
    LedgerError::Rejected(msg.into())
}

fn addr_arg(args: &[Value], i: usize, what: &str) -> Result<Address, LedgerError> {
    args.get(i)
        .and_then(Value::as_address)
        .ok_or_else(|| rejected(format!("{what}: argument {i} must be an address")))
}

fn uint_arg(args: &[Value], i: usize, what: &str) -> Result<u128, LedgerError> {
    args.get(i)
        .and_then(Value::as_uint)
        .ok_or_else(|| rejected(format!("{what}: argument {i} must be a uint")))
}

fn u64_arg(args: &[Value], i: usize, what: &str) -> Result<u64, LedgerError> {
    u64::try_from(uint_arg(args, i, what)?)
        .map_err(|_| rejected(format!("{what}: argument {i} out of range")))
}

impl SimLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long (outside the state lock) between submission and confirmation.
    #[must_use]
    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Transient("simulator state poisoned".to_string()))
    }

    /// Attach behaviour to a contract type name.
    pub fn register(&self, contract_type: impl Into<String>, kind: SimKind) -> &Self {
        if let Ok(mut g) = self.inner.lock() {
            g.kinds.insert(contract_type.into(), kind);
        }
        self
    }

    /// Make the next `times` operations matching `selector` (method name, or contract type
    /// for deploys) fail with `kind`. Faults fire before any state change.
    pub fn fail_next(&self, selector: impl Into<String>, kind: FaultKind, times: u32) -> &Self {
        if let Ok(mut g) = self.inner.lock() {
            g.faults.push(Fault {
                selector: selector.into(),
                kind,
                remaining: times,
            });
        }
        self
    }

    /// After `n` more successful submissions every operation fails transiently,
    /// modelling a process that loses its connection mid-run.
    pub fn offline_after(&self, n: usize) -> &Self {
        if let Ok(mut g) = self.inner.lock() {
            let done = g.submissions.iter().filter(|s| s.ok).count();
            g.offline_after = Some(done + n);
        }
        self
    }

    pub fn set_online(&self) -> &Self {
        if let Ok(mut g) = self.inner.lock() {
            g.offline_after = None;
        }
        self
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.inner
            .lock()
            .map(|g| g.submissions.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn reads(&self) -> u64 {
        self.inner.lock().map(|g| g.reads).unwrap_or_default()
    }

    /// Times a signer had a second submission start while one was still in flight.
    #[must_use]
    pub fn signer_conflicts(&self) -> u64 {
        self.inner
            .lock()
            .map(|g| g.signer_conflicts)
            .unwrap_or_default()
    }

    /// Highest number of submissions in flight at once across all signers.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.inner
            .lock()
            .map(|g| g.max_in_flight_total)
            .unwrap_or_default()
    }

    /// Deployed contracts of a type, in deploy order.
    #[must_use]
    pub fn deployed(&self, contract_type: &str) -> Vec<Address> {
        self.inner
            .lock()
            .map(|g| {
                g.deploy_order
                    .iter()
                    .filter(|(t, _)| t == contract_type)
                    .map(|(_, a)| *a)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn balance_of(&self, token: Address, holder: Address) -> Amount {
        let Ok(g) = self.inner.lock() else {
            return Amount::ZERO;
        };
        match g.contracts.get(&token).map(|c| &c.state) {
            Some(State::Token { balances, .. }) => {
                Amount(balances.get(&holder).copied().unwrap_or_default())
            }
            _ => Amount::ZERO,
        }
    }

    #[must_use]
    pub fn is_whitelisted(&self, whitelist: Address, who: Address) -> bool {
        let Ok(g) = self.inner.lock() else {
            return false;
        };
        matches!(
            g.contracts.get(&whitelist).map(|c| &c.state),
            Some(State::Whitelist { members }) if members.contains(&who)
        )
    }

    #[must_use]
    pub fn schedules(&self, holder: Address) -> Vec<VestingSchedule> {
        let Ok(g) = self.inner.lock() else {
            return Vec::new();
        };
        match g.contracts.get(&holder).map(|c| &c.state) {
            Some(State::Vesting { schedules, .. }) => schedules.clone(),
            _ => Vec::new(),
        }
    }

    /// Fault gate shared by every operation.
    fn check_faults(g: &mut Inner, selector: &str, timeout_ms: u64) -> Result<(), LedgerError> {
        if let Some(limit) = g.offline_after {
            if g.submissions.iter().filter(|s| s.ok).count() >= limit {
                return Err(LedgerError::Transient("connection lost".to_string()));
            }
        }
        if let Some(f) = g
            .faults
            .iter_mut()
            .find(|f| f.selector == selector && f.remaining > 0)
        {
            f.remaining -= 1;
            return Err(match f.kind {
                FaultKind::Transient => LedgerError::Transient(format!("injected fault on {selector}")),
                FaultKind::Timeout => LedgerError::Timeout(timeout_ms),
                FaultKind::Reject => rejected(format!("injected revert on {selector}")),
            });
        }
        Ok(())
    }

    /// Submission bracket: track concurrency, wait out the latency, then apply `f`
    /// under the lock with the signer's next nonce.
    fn submit<F>(
        &self,
        signer: &str,
        selector: &str,
        timeout_ms: u64,
        f: F,
    ) -> Result<Receipt, LedgerError>
    where
        F: FnOnce(&mut Inner, Address, u64) -> Result<Vec<Value>, LedgerError>,
    {
        {
            let mut guard = self.lock()?;
            let g = &mut *guard;
            Self::check_faults(g, selector, timeout_ms)?;
            let n = g.in_flight.entry(signer.to_string()).or_insert(0);
            *n += 1;
            if *n > 1 {
                g.signer_conflicts += 1;
            }
            g.in_flight_total += 1;
            g.max_in_flight_total = g.max_in_flight_total.max(g.in_flight_total);
        }
        if self.latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.latency_ms));
        }
        let mut guard = self.lock()?;
        let g = &mut *guard;
        if let Some(n) = g.in_flight.get_mut(signer) {
            *n = n.saturating_sub(1);
        }
        g.in_flight_total = g.in_flight_total.saturating_sub(1);
        if self.latency_ms > timeout_ms {
            return Err(LedgerError::Timeout(timeout_ms));
        }

        let from = signer_address(signer);
        let nonce = g.nonces.get(signer).copied().unwrap_or(0);
        g.nonces.insert(signer.to_string(), nonce + 1);
        let digest = tx_digest(&from, nonce);
        let res = f(g, from, nonce);
        g.submissions.push(Submission {
            signer: signer.to_string(),
            nonce,
            what: selector.to_string(),
            ok: res.is_ok(),
        });
        res.map(|values| Receipt {
            values,
            tx_hash: Some(format!("0x{}", hex::encode(digest))),
        })
    }
}

fn first20(d: &[u8; 32]) -> [u8; 20] {
    let mut a = [0u8; 20];
    a.copy_from_slice(&d[..20]);
    a
}

fn token_transfer(
    g: &mut Inner,
    token: Address,
    from: Address,
    to: Address,
    amount: u128,
) -> Result<(), LedgerError> {
    let gate = match g.contracts.get(&token).map(|c| &c.state) {
        Some(State::Token { whitelist, .. }) => *whitelist,
        _ => return Err(rejected(format!("{token} is not a token"))),
    };
    if let Some(wl) = gate {
        let ok = matches!(
            g.contracts.get(&wl).map(|c| &c.state),
            Some(State::Whitelist { members }) if members.contains(&to)
        );
        if !ok {
            return Err(rejected(format!("recipient {to} is not whitelisted")));
        }
    }
    let Some(State::Token { balances, .. }) = g.contracts.get_mut(&token).map(|c| &mut c.state)
    else {
        return Err(rejected(format!("{token} is not a token")));
    };
    let have = balances.get(&from).copied().unwrap_or_default();
    if have < amount {
        return Err(rejected(format!(
            "transfer amount {amount} exceeds balance {have}"
        )));
    }
    balances.insert(from, have - amount);
    *balances.entry(to).or_insert(0) += amount;
    Ok(())
}

fn token_balance(g: &Inner, token: Address, holder: Address) -> u128 {
    match g.contracts.get(&token).map(|c| &c.state) {
        Some(State::Token { balances, .. }) => balances.get(&holder).copied().unwrap_or_default(),
        _ => 0,
    }
}

impl Ledger for SimLedger {
    fn deploy(
        &self,
        signer: &str,
        contract: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<Receipt, LedgerError> {
        self.submit(signer, contract, timeout_ms, |g, from, nonce| {
            let kind = g
                .kinds
                .get(contract)
                .cloned()
                .ok_or_else(|| rejected(format!("unknown contract type {contract}")))?;
            let addr = Address::from_bytes(first20(&tx_digest(&from, nonce)));
            let state = match kind {
                SimKind::Token {
                    supply,
                    gated_by_arg,
                } => {
                    let whitelist = gated_by_arg
                        .map(|i| addr_arg(args, i, contract))
                        .transpose()?;
                    let mut balances = BTreeMap::new();
                    balances.insert(from, supply.0);
                    State::Token {
                        balances,
                        whitelist,
                    }
                }
                SimKind::Whitelist => State::Whitelist {
                    members: BTreeSet::new(),
                },
                SimKind::Vesting { token_arg } => State::Vesting {
                    token: addr_arg(args, token_arg, contract)?,
                    schedules: Vec::new(),
                },
                SimKind::Generic => State::Generic,
            };
            g.deploy_order.push((contract.to_string(), addr));
            g.contracts.insert(
                addr,
                Contract {
                    owner: from,
                    state,
                },
            );
            Ok(vec![Value::Address(addr)])
        })
    }

    fn call(
        &self,
        signer: &str,
        target: Address,
        method: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<Receipt, LedgerError> {
        self.submit(signer, method, timeout_ms, |g, from, _nonce| {
            let (owner, state) = match g.contracts.get(&target) {
                Some(c) => (c.owner, c.state.clone()),
                None => return Err(rejected(format!("no contract at {target}"))),
            };
            match (state, method) {
                (State::Token { .. }, "transfer") => {
                    let to = addr_arg(args, 0, method)?;
                    let amount = uint_arg(args, 1, method)?;
                    token_transfer(g, target, from, to, amount)?;
                    Ok(vec![Value::Bool(true)])
                }
                (State::Whitelist { .. }, "addToWhitelist") => {
                    if from != owner {
                        return Err(rejected("caller is not the whitelist owner"));
                    }
                    let who = addr_arg(args, 0, method)?;
                    if let Some(State::Whitelist { members }) =
                        g.contracts.get_mut(&target).map(|c| &mut c.state)
                    {
                        members.insert(who);
                    }
                    Ok(Vec::new())
                }
                (State::Vesting { token, schedules }, "createVestingSchedule") => {
                    if from != owner {
                        return Err(rejected("caller is not the vesting owner"));
                    }
                    let s = VestingSchedule {
                        beneficiary: addr_arg(args, 0, method)?,
                        start: u64_arg(args, 1, method)?,
                        cliff: u64_arg(args, 2, method)?,
                        duration: u64_arg(args, 3, method)?,
                        slice_interval: u64_arg(args, 4, method)?,
                        revocable: args
                            .get(5)
                            .and_then(Value::as_bool)
                            .ok_or_else(|| rejected("createVestingSchedule: argument 5 must be a bool"))?,
                        amount: Amount(uint_arg(args, 6, method)?),
                    };
                    if s.slice_interval == 0 || s.cliff > s.duration {
                        return Err(rejected("invalid vesting terms"));
                    }
                    let committed: u128 = schedules.iter().map(|s| s.amount.0).sum();
                    let escrow = token_balance(g, token, target);
                    if escrow < committed.saturating_add(s.amount.0) {
                        return Err(rejected(format!(
                            "escrow {escrow} cannot cover {} already committed plus {}",
                            committed, s.amount
                        )));
                    }
                    let index = schedules.len() as u128;
                    if let Some(State::Vesting { schedules, .. }) =
                        g.contracts.get_mut(&target).map(|c| &mut c.state)
                    {
                        schedules.push(s);
                    }
                    Ok(vec![Value::Uint(index)])
                }
                (State::Generic, _) => Ok(Vec::new()),
                (_, m) => Err(rejected(format!("unknown method {m}"))),
            }
        })
    }

    fn static_call(
        &self,
        target: Address,
        method: &str,
        args: &[Value],
        timeout_ms: u64,
    ) -> Result<Vec<Value>, LedgerError> {
        let mut g = self.lock()?;
        Self::check_faults(&mut g, method, timeout_ms)?;
        g.reads += 1;
        let c = g
            .contracts
            .get(&target)
            .ok_or_else(|| rejected(format!("no contract at {target}")))?;
        match (&c.state, method) {
            (State::Token { balances, .. }, "balanceOf") => {
                let who = addr_arg(args, 0, method)?;
                Ok(vec![Value::Uint(balances.get(&who).copied().unwrap_or_default())])
            }
            (State::Whitelist { members }, "isWhitelisted") => {
                let who = addr_arg(args, 0, method)?;
                Ok(vec![Value::Bool(members.contains(&who))])
            }
            (State::Vesting { schedules, .. }, "scheduleCount") => {
                Ok(vec![Value::Uint(schedules.len() as u128)])
            }
            (State::Vesting { schedules, .. }, "vestedAmount") => {
                let who = addr_arg(args, 0, method)?;
                let now = u64_arg(args, 1, method)?;
                let vested: u128 = schedules
                    .iter()
                    .filter(|s| s.beneficiary == who)
                    .map(|s| s.terms().vested_amount(s.amount, now).0)
                    .sum();
                Ok(vec![Value::Uint(vested)])
            }
            (State::Generic, _) => Ok(Vec::new()),
            (_, m) => Err(rejected(format!("unknown view {m}"))),
        }
    }
}
