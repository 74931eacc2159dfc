//! Declarative campaign input: deployments, whitelist targets, allocations.
//!
//! These structures arrive already parsed (see `campaign::yaml` for the file loader);
//! the builder in `campaign::builder` turns them into a `Plan`.
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_SIGNER, METHOD_ADD_TO_WHITELIST, METHOD_BALANCE_OF, METHOD_CREATE_VESTING,
    METHOD_TRANSFER,
};

use super::value::{dec_str, Address, Amount};

/// Constructor or call argument as authored. `Contract` names another entry of
/// `CampaignSpec::contracts` and becomes a future when that contract is deployed by the plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSpec {
    Address(Address),
    Uint(#[serde(with = "dec_str")] u128),
    Bool(bool),
    Str(String),
    Contract(String),
}

/// Who receives an allocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Address(Address),
    Contract(String),
}

/// Time-released claim structure. All values are seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingTerms {
    /// Absolute unix timestamp.
    pub start: u64,
    pub cliff: u64,
    /// Total window, inclusive of the cliff.
    pub duration: u64,
    pub slice_interval: u64,
    #[serde(default)]
    pub revocable: bool,
}

impl VestingTerms {
    /// Amount claimable at `now` out of `total`, released linearly in whole slices
    /// once the cliff has passed.
    #[must_use]
    pub fn vested_amount(&self, total: Amount, now: u64) -> Amount {
        if now < self.start.saturating_add(self.cliff) {
            return Amount::ZERO;
        }
        if self.duration == 0 || now >= self.start.saturating_add(self.duration) {
            return total;
        }
        let elapsed = now - self.start;
        let slice = self.slice_interval.max(1);
        let vested_secs = u128::from((elapsed / slice) * slice);
        let duration = u128::from(self.duration);
        match total.0.checked_mul(vested_secs) {
            Some(p) => Amount(p / duration),
            None => Amount(total.0 / duration * vested_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSpec {
    pub name: String,
    pub amount: Amount,
    pub recipient: Recipient,
    #[serde(default)]
    pub vesting: Option<VestingTerms>,
}

/// A contract the campaign deploys, or references when `at` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Logical name used by `ArgSpec::Contract` and `Recipient::Contract`.
    pub name: String,
    /// Contract type handed to the ledger's `deploy`.
    pub contract: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// Already deployed at this address; no deploy action is emitted.
    #[serde(default)]
    pub at: Option<Address>,
    /// Deploying and owning signer; defaults to the campaign signer.
    #[serde(default)]
    pub signer: Option<String>,
    /// Transfers of this token require whitelisted recipients.
    #[serde(default)]
    pub whitelist_gated: bool,
}

/// A call issued after every transfer has been confirmed, e.g. starting an ICO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupSpec {
    pub name: String,
    pub contract: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
}

/// Method names and optional steps used by the builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Emit a balance read after each direct transfer.
    pub verify_direct: bool,
    pub transfer_method: String,
    pub whitelist_method: String,
    pub vesting_method: String,
    pub balance_method: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            verify_direct: true,
            transfer_method: METHOD_TRANSFER.to_string(),
            whitelist_method: METHOD_ADD_TO_WHITELIST.to_string(),
            vesting_method: METHOD_CREATE_VESTING.to_string(),
            balance_method: METHOD_BALANCE_OF.to_string(),
        }
    }
}

fn default_signer() -> String {
    DEFAULT_SIGNER.to_string()
}

/// One distribution campaign: the static target state a plan is derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSpec {
    /// Campaign id; keys the journal.
    pub name: String,
    /// Fixed total the allocations must sum to.
    #[serde(default)]
    pub expected_total: Option<Amount>,
    /// Logical name of the token contract.
    pub token: String,
    #[serde(default)]
    pub whitelist: Option<String>,
    /// Logical name of the contract that escrows vested allocations.
    #[serde(default)]
    pub vesting_holder: Option<String>,
    #[serde(default = "default_signer")]
    pub signer: String,
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    #[serde(default)]
    pub whitelist_targets: Vec<Recipient>,
    #[serde(default)]
    pub allocations: Vec<AllocationSpec>,
    #[serde(default)]
    pub followups: Vec<FollowupSpec>,
    /// Address the supply was minted to, for the remaining-balance read.
    #[serde(default)]
    pub deployer: Option<Address>,
    /// Expected deployer balance once every transfer is confirmed.
    #[serde(default)]
    pub deployer_remaining: Option<Amount>,
    #[serde(default)]
    pub options: BuildOptions,
}

impl CampaignSpec {
    /// Minimal campaign skeleton around a token contract.
    pub fn new(name: impl Into<String>, token: ContractSpec) -> Self {
        Self {
            name: name.into(),
            expected_total: None,
            token: token.name.clone(),
            whitelist: None,
            vesting_holder: None,
            signer: default_signer(),
            contracts: vec![token],
            whitelist_targets: Vec::new(),
            allocations: Vec::new(),
            followups: Vec::new(),
            deployer: None,
            deployer_remaining: None,
            options: BuildOptions::default(),
        }
    }

    #[must_use]
    pub fn contract(&self, name: &str) -> Option<&ContractSpec> {
        self.contracts.iter().find(|c| c.name == name)
    }
}

impl ContractSpec {
    pub fn new(name: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: contract.into(),
            args: Vec::new(),
            at: None,
            signer: None,
            whitelist_gated: false,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<ArgSpec>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn gated(mut self) -> Self {
        self.whitelist_gated = true;
        self
    }

    #[must_use]
    pub fn deployed_at(mut self, at: Address) -> Self {
        self.at = Some(at);
        self
    }
}

impl AllocationSpec {
    pub fn direct(name: impl Into<String>, amount: Amount, recipient: Recipient) -> Self {
        Self {
            name: name.into(),
            amount,
            recipient,
            vesting: None,
        }
    }

    pub fn vested(
        name: impl Into<String>,
        amount: Amount,
        recipient: Recipient,
        terms: VestingTerms,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            recipient,
            vesting: Some(terms),
        }
    }
}
