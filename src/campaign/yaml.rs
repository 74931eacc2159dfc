//! YAML campaign loader.
//!
//! Amounts are written as whole-token decimal strings (`"69000000"`, `"0.5"`) and
//! scaled by `decimals` into base units, the way `parseEther` does for 18 decimals.
//! Arguments and recipients are small maps with exactly one key set.
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::DEFAULT_DECIMALS;
use crate::types::campaign::{
    AllocationSpec, ArgSpec, BuildOptions, CampaignSpec, ContractSpec, FollowupSpec, Recipient,
    VestingTerms,
};
use crate::types::value::{Address, Amount};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading campaign file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing campaign yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("campaign field `{field}`: {msg}")]
    Invalid { field: String, msg: String },
}

fn invalid(field: impl Into<String>, msg: impl Into<String>) -> LoadError {
    LoadError::Invalid {
        field: field.into(),
        msg: msg.into(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CampaignDoc {
    name: String,
    #[serde(default)]
    decimals: Option<u32>,
    #[serde(default)]
    expected_total: Option<String>,
    token: String,
    #[serde(default)]
    whitelist: Option<String>,
    #[serde(default)]
    vesting_holder: Option<String>,
    #[serde(default)]
    signer: Option<String>,
    #[serde(default)]
    deployer: Option<Address>,
    #[serde(default)]
    deployer_remaining: Option<String>,
    #[serde(default)]
    contracts: Vec<ContractDoc>,
    #[serde(default)]
    whitelist_targets: Vec<TargetDoc>,
    #[serde(default)]
    allocations: Vec<AllocationDoc>,
    #[serde(default)]
    followups: Vec<FollowupDoc>,
    #[serde(default)]
    options: Option<BuildOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContractDoc {
    name: String,
    contract: String,
    #[serde(default)]
    args: Vec<ArgDoc>,
    #[serde(default)]
    at: Option<Address>,
    #[serde(default)]
    signer: Option<String>,
    #[serde(default)]
    whitelist_gated: bool,
}

/// Exactly one field set.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArgDoc {
    address: Option<Address>,
    uint: Option<String>,
    /// Whole-token amount, scaled by `decimals`.
    tokens: Option<String>,
    bool: Option<bool>,
    str: Option<String>,
    contract: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetDoc {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    contract: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AllocationDoc {
    name: String,
    amount: String,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    contract: Option<String>,
    #[serde(default)]
    vesting: Option<VestingTerms>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FollowupDoc {
    name: String,
    contract: String,
    method: String,
    #[serde(default)]
    args: Vec<ArgDoc>,
}

fn amount(field: &str, s: &str, decimals: u32) -> Result<Amount, LoadError> {
    Amount::parse_units(s, decimals).map_err(|e| invalid(field, e.msg))
}

fn recipient(
    field: &str,
    address: Option<Address>,
    contract: Option<String>,
) -> Result<Recipient, LoadError> {
    match (address, contract) {
        (Some(a), None) => Ok(Recipient::Address(a)),
        (None, Some(c)) => Ok(Recipient::Contract(c)),
        _ => Err(invalid(field, "set exactly one of `address` or `contract`")),
    }
}

fn arg(field: &str, a: ArgDoc, decimals: u32) -> Result<ArgSpec, LoadError> {
    let set = [
        a.address.is_some(),
        a.uint.is_some(),
        a.tokens.is_some(),
        a.bool.is_some(),
        a.str.is_some(),
        a.contract.is_some(),
    ]
    .iter()
    .filter(|b| **b)
    .count();
    if set != 1 {
        return Err(invalid(field, "argument must set exactly one key"));
    }
    if let Some(x) = a.address {
        return Ok(ArgSpec::Address(x));
    }
    if let Some(s) = a.uint {
        let v = s
            .trim()
            .parse::<u128>()
            .map_err(|e| invalid(field, format!("uint `{s}`: {e}")))?;
        return Ok(ArgSpec::Uint(v));
    }
    if let Some(s) = a.tokens {
        return Ok(ArgSpec::Uint(amount(field, &s, decimals)?.0));
    }
    if let Some(b) = a.bool {
        return Ok(ArgSpec::Bool(b));
    }
    if let Some(c) = a.contract {
        return Ok(ArgSpec::Contract(c));
    }
    Ok(ArgSpec::Str(a.str.unwrap_or_default()))
}

fn args(field: &str, docs: Vec<ArgDoc>, decimals: u32) -> Result<Vec<ArgSpec>, LoadError> {
    docs.into_iter()
        .enumerate()
        .map(|(i, a)| arg(&format!("{field}[{i}]"), a, decimals))
        .collect()
}

/// Parse a campaign from YAML text.
///
/// # Errors
///
/// Returns `LoadError::Parse` for malformed YAML or unknown keys and
/// `LoadError::Invalid` for bad amounts or ambiguous recipients.
pub fn load_str(s: &str) -> Result<CampaignSpec, LoadError> {
    let doc: CampaignDoc = serde_yaml::from_str(s)?;
    let dec = doc.decimals.unwrap_or(DEFAULT_DECIMALS);

    let contracts = doc
        .contracts
        .into_iter()
        .map(|c| {
            let field = format!("contracts.{}.args", c.name);
            Ok(ContractSpec {
                args: args(&field, c.args, dec)?,
                name: c.name,
                contract: c.contract,
                at: c.at,
                signer: c.signer,
                whitelist_gated: c.whitelist_gated,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let whitelist_targets = doc
        .whitelist_targets
        .into_iter()
        .enumerate()
        .map(|(i, t)| recipient(&format!("whitelist_targets[{i}]"), t.address, t.contract))
        .collect::<Result<Vec<_>, _>>()?;

    let allocations = doc
        .allocations
        .into_iter()
        .map(|a| {
            let field = format!("allocations.{}", a.name);
            Ok(AllocationSpec {
                amount: amount(&field, &a.amount, dec)?,
                recipient: recipient(&field, a.address, a.contract)?,
                vesting: a.vesting,
                name: a.name,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let followups = doc
        .followups
        .into_iter()
        .map(|f| {
            let field = format!("followups.{}.args", f.name);
            Ok(FollowupSpec {
                args: args(&field, f.args, dec)?,
                name: f.name,
                contract: f.contract,
                method: f.method,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let expected_total = doc
        .expected_total
        .as_deref()
        .map(|s| amount("expected_total", s, dec))
        .transpose()?;
    let deployer_remaining = doc
        .deployer_remaining
        .as_deref()
        .map(|s| amount("deployer_remaining", s, dec))
        .transpose()?;

    Ok(CampaignSpec {
        name: doc.name,
        expected_total,
        token: doc.token,
        whitelist: doc.whitelist,
        vesting_holder: doc.vesting_holder,
        signer: doc
            .signer
            .unwrap_or_else(|| crate::constants::DEFAULT_SIGNER.to_string()),
        contracts,
        whitelist_targets,
        allocations,
        followups,
        deployer: doc.deployer,
        deployer_remaining,
        options: doc.options.unwrap_or_default(),
    })
}

/// Read and parse a campaign file.
///
/// # Errors
///
/// See [`load_str`]; additionally `LoadError::Io` when the file cannot be read.
pub fn load_path(path: &Path) -> Result<CampaignSpec, LoadError> {
    let s = std::fs::read_to_string(path)?;
    load_str(&s)
}
