//! Derive a deterministic action graph from a `CampaignSpec`.
//!
//! Ids compose a kind prefix, the logical name, and the position in the input
//! list (`deploy_token_1`, `transfer_TEAM_4`, `whitelist_2`), so rebuilding from
//! the same campaign yields the same ids and edges and a journal from an earlier run
//! stays valid.
use std::collections::BTreeMap;

use crate::graph::PlanBuilder;
use crate::types::action::{Action, ActionId, Arg, Expectation, FutureRef};
use crate::types::campaign::{AllocationSpec, ArgSpec, CampaignSpec, ContractSpec, Recipient};
use crate::types::errors::ConstructionError;
use crate::types::plan::{BalanceCheck, Plan};
use crate::types::value::{Amount, Value};

/// Build the plan for one campaign. Fails without returning a partial plan.
///
/// # Errors
///
/// Returns a `ConstructionError` for invalid allocations, unknown or duplicate
/// contracts, a gated token without whitelist, or an invalid graph.
pub fn build(spec: &CampaignSpec) -> Result<Plan, ConstructionError> {
    validate(spec)?;
    let mut cx = Ctx::new(spec);

    for (i, c) in spec.contracts.iter().enumerate() {
        if c.at.is_some() {
            continue;
        }
        let args = c
            .args
            .iter()
            .map(|a| cx.arg(a))
            .collect::<Result<Vec<_>, _>>()?;
        let id = deploy_id(c, i);
        let action = Action::deploy(id, c.contract.clone(), args)
            .signed_by(cx.signer_of(c))
            .labelled(format!("deploy {} as {}", c.contract, c.name));
        cx.b.push(action);
    }

    for r in &spec.whitelist_targets {
        let target = cx.recipient(r)?;
        cx.whitelist(target, recipient_label(r))?;
    }

    let token = cx.contract(&spec.token)?;
    let token_gated = spec
        .contract(&spec.token)
        .is_some_and(|c| c.whitelist_gated);
    let opts = &spec.options;

    let mut transfers: Vec<ActionId> = Vec::new();
    // Final holder of each allocation, keyed by argument identity, in first-seen order.
    let mut holders: Vec<(Arg, String, Amount, Vec<String>, Vec<ActionId>)> = Vec::new();

    for (i, alloc) in spec.allocations.iter().enumerate() {
        let beneficiary = cx.recipient(&alloc.recipient)?;
        let (to, to_label) = match (&alloc.vesting, &spec.vesting_holder) {
            (Some(_), Some(holder)) => (cx.contract(holder)?, holder.clone()),
            _ => (beneficiary.clone(), recipient_label(&alloc.recipient)),
        };

        let mut transfer = Action::call(
            format!("transfer_{}_{i}", alloc.name),
            token.clone(),
            opts.transfer_method.clone(),
            vec![to.clone(), alloc.amount.into()],
        )
        .signed_by(spec.signer.clone())
        .labelled(format!("transfer {} for {} to {to_label}", alloc.amount, alloc.name));
        if token_gated {
            let wl = cx.whitelist(to.clone(), to_label.clone())?;
            transfer = transfer.after(wl);
        }
        let transfer_id = cx.b.push(transfer);
        transfers.push(transfer_id.clone());

        match holders.iter_mut().find(|h| h.0 == to) {
            Some(h) => {
                h.2 = h.2.checked_add(alloc.amount).ok_or(ConstructionError::SupplyOverflow)?;
                h.3.push(alloc.name.clone());
                h.4.push(transfer_id.clone());
            }
            None => holders.push((
                to.clone(),
                to_label.clone(),
                alloc.amount,
                vec![alloc.name.clone()],
                vec![transfer_id.clone()],
            )),
        }

        match (&alloc.vesting, &spec.vesting_holder) {
            (Some(terms), Some(holder_name)) => {
                let holder = to.clone();
                let mut create = Action::call(
                    format!("vesting_{}_{i}", alloc.name),
                    holder.clone(),
                    opts.vesting_method.clone(),
                    vec![
                        beneficiary.clone(),
                        Arg::Literal(Value::Uint(u128::from(terms.start))),
                        Arg::Literal(Value::Uint(u128::from(terms.cliff))),
                        Arg::Literal(Value::Uint(u128::from(terms.duration))),
                        Arg::Literal(Value::Uint(u128::from(terms.slice_interval))),
                        Arg::Literal(Value::Bool(terms.revocable)),
                        alloc.amount.into(),
                    ],
                )
                .after(transfer_id.clone())
                .signed_by(cx.signer_of_name(holder_name))
                .labelled(format!(
                    "vesting schedule for {} ({})",
                    recipient_label(&alloc.recipient),
                    alloc.name
                ));
                if token_gated {
                    let wl =
                        cx.whitelist(beneficiary.clone(), recipient_label(&alloc.recipient))?;
                    create = create.after(wl);
                }
                let create_id = cx.b.push(create);
                cx.b.push(
                    Action::static_call(
                        format!("verify_{}_{i}", alloc.name),
                        token.clone(),
                        opts.balance_method.clone(),
                        vec![holder],
                    )
                    .after(create_id)
                    .expecting(Expectation::BalanceAtLeast(alloc.amount))
                    .labelled(format!("check {holder_name} holds {}", alloc.name)),
                );
            }
            _ => {
                if opts.verify_direct {
                    cx.b.push(
                        Action::static_call(
                            format!("verify_{}_{i}", alloc.name),
                            token.clone(),
                            opts.balance_method.clone(),
                            vec![to.clone()],
                        )
                        .after(transfer_id)
                        .expecting(Expectation::BalanceAtLeast(alloc.amount))
                        .labelled(format!("check {to_label} received {}", alloc.name)),
                    );
                }
            }
        }
    }

    for (k, (arg, label, expected, names, deps)) in holders.into_iter().enumerate() {
        let mut read = Action::static_call(
            format!("balance_{k}"),
            token.clone(),
            opts.balance_method.clone(),
            vec![arg],
        )
        .labelled(format!("final balance of {label}"));
        for d in deps {
            read = read.after(d);
        }
        let action = cx.b.push(read);
        cx.b.balance_check(BalanceCheck {
            action,
            recipient: label,
            expected,
            allocations: names,
        });
    }

    if let Some(deployer) = spec.deployer {
        let mut read = Action::static_call(
            "balance_deployer",
            token.clone(),
            opts.balance_method.clone(),
            vec![deployer.into()],
        )
        .labelled("remaining deployer balance");
        if let Some(rem) = spec.deployer_remaining {
            read = read.expecting(Expectation::Equals(Value::Uint(rem.0)));
        }
        for t in &transfers {
            read = read.after(t.clone());
        }
        cx.b.push(read);
    }

    for (i, f) in spec.followups.iter().enumerate() {
        let instance = cx.contract(&f.contract)?;
        let args = f
            .args
            .iter()
            .map(|a| cx.arg(a))
            .collect::<Result<Vec<_>, _>>()?;
        let mut call = Action::call(
            format!("call_{}_{i}", f.name),
            instance,
            f.method.clone(),
            args,
        )
        .signed_by(cx.signer_of_name(&f.contract))
        .labelled(format!("{}.{} ({})", f.contract, f.method, f.name));
        for t in &transfers {
            call = call.after(t.clone());
        }
        cx.b.push(call);
    }

    let Ctx { mut b, .. } = cx;
    b.allocations(spec.allocations.clone())
        .expected_total(spec.expected_total);
    b.finish()
}

fn deploy_id(c: &ContractSpec, i: usize) -> String {
    format!("deploy_{}_{i}", c.name)
}

fn recipient_label(r: &Recipient) -> String {
    match r {
        Recipient::Address(a) => a.to_string(),
        Recipient::Contract(n) => n.clone(),
    }
}

fn validate(spec: &CampaignSpec) -> Result<(), ConstructionError> {
    let mut names: BTreeMap<&str, ()> = BTreeMap::new();
    for c in &spec.contracts {
        if names.insert(c.name.as_str(), ()).is_some() {
            return Err(ConstructionError::DuplicateContract(c.name.clone()));
        }
    }
    let known = |n: &str| -> Result<(), ConstructionError> {
        if names.contains_key(n) {
            Ok(())
        } else {
            Err(ConstructionError::UnknownContract(n.to_string()))
        }
    };
    known(&spec.token)?;
    if let Some(w) = &spec.whitelist {
        known(w)?;
    }
    if let Some(h) = &spec.vesting_holder {
        known(h)?;
    }
    if spec.contract(&spec.token).is_some_and(|c| c.whitelist_gated) && spec.whitelist.is_none() {
        return Err(ConstructionError::MissingWhitelist(spec.token.clone()));
    }
    if !spec.whitelist_targets.is_empty() && spec.whitelist.is_none() {
        return Err(ConstructionError::InvalidSpec(
            "whitelist targets given but no whitelist contract".to_string(),
        ));
    }
    if spec.deployer_remaining.is_some() && spec.deployer.is_none() {
        return Err(ConstructionError::InvalidSpec(
            "deployer_remaining requires a deployer address".to_string(),
        ));
    }

    let mut total = Amount::ZERO;
    for a in &spec.allocations {
        validate_allocation(spec, a)?;
        if let Recipient::Contract(n) = &a.recipient {
            known(n)?;
        }
        total = total
            .checked_add(a.amount)
            .ok_or(ConstructionError::SupplyOverflow)?;
    }
    for f in &spec.followups {
        known(&f.contract)?;
    }
    Ok(())
}

fn validate_allocation(spec: &CampaignSpec, a: &AllocationSpec) -> Result<(), ConstructionError> {
    if a.amount.is_zero() {
        return Err(ConstructionError::ZeroAmount(a.name.clone()));
    }
    if let Some(t) = &a.vesting {
        if t.cliff > t.duration {
            return Err(ConstructionError::CliffExceedsDuration {
                name: a.name.clone(),
                cliff: t.cliff,
                duration: t.duration,
            });
        }
        if t.slice_interval == 0 {
            return Err(ConstructionError::ZeroSliceInterval(a.name.clone()));
        }
        if spec.vesting_holder.is_none() {
            return Err(ConstructionError::MissingVestingHolder(a.name.clone()));
        }
    }
    Ok(())
}

struct Ctx<'s> {
    spec: &'s CampaignSpec,
    b: PlanBuilder,
    whitelisted: Vec<(Arg, ActionId)>,
}

impl<'s> Ctx<'s> {
    fn new(spec: &'s CampaignSpec) -> Self {
        Self {
            spec,
            b: PlanBuilder::new(spec.name.clone()),
            whitelisted: Vec::new(),
        }
    }

    /// Address of a named contract: a literal when pre-deployed, otherwise a future.
    fn contract(&self, name: &str) -> Result<Arg, ConstructionError> {
        let (i, c) = self
            .spec
            .contracts
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
            .ok_or_else(|| ConstructionError::UnknownContract(name.to_string()))?;
        Ok(match c.at {
            Some(addr) => addr.into(),
            None => FutureRef::deployed(deploy_id(c, i)).into(),
        })
    }

    fn arg(&self, a: &ArgSpec) -> Result<Arg, ConstructionError> {
        Ok(match a {
            ArgSpec::Address(x) => (*x).into(),
            ArgSpec::Uint(v) => Arg::Literal(Value::Uint(*v)),
            ArgSpec::Bool(v) => Arg::Literal(Value::Bool(*v)),
            ArgSpec::Str(s) => Arg::Literal(Value::Str(s.clone())),
            ArgSpec::Contract(n) => self.contract(n)?,
        })
    }

    fn recipient(&self, r: &Recipient) -> Result<Arg, ConstructionError> {
        match r {
            Recipient::Address(a) => Ok((*a).into()),
            Recipient::Contract(n) => self.contract(n),
        }
    }

    fn signer_of(&self, c: &ContractSpec) -> String {
        c.signer.clone().unwrap_or_else(|| self.spec.signer.clone())
    }

    fn signer_of_name(&self, name: &str) -> String {
        self.spec
            .contract(name)
            .map_or_else(|| self.spec.signer.clone(), |c| self.signer_of(c))
    }

    /// Whitelist call for `target`, reusing an earlier one for the same address or future.
    fn whitelist(&mut self, target: Arg, label: String) -> Result<ActionId, ConstructionError> {
        if let Some((_, id)) = self.whitelisted.iter().find(|(a, _)| *a == target) {
            return Ok(id.clone());
        }
        let wl_name = self
            .spec
            .whitelist
            .clone()
            .ok_or_else(|| ConstructionError::MissingWhitelist(self.spec.token.clone()))?;
        let instance = self.contract(&wl_name)?;
        let id = ActionId::new(format!("whitelist_{}", self.whitelisted.len()));
        let action = Action::call(
            id.clone(),
            instance,
            self.spec.options.whitelist_method.clone(),
            vec![target.clone()],
        )
        .signed_by(self.signer_of_name(&wl_name))
        .labelled(format!("whitelist {label}"));
        self.b.push(action);
        self.whitelisted.push((target, id.clone()));
        Ok(id)
    }
}
