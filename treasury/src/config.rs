//! Treasury configuration
//!
//! `TreasuryConfig` is the immutable parameter set baked into the treasury's
//! validators. `Settings` is the on-disk TOML file an application loads it
//! from, together with the network and blueprint location.
//!
//! Example `treasury.toml`:
//!
//! ```toml
//! network = "preview"
//! blueprint = "plutus.json"
//!
//! [treasury]
//! threshold = 2
//! allowance = 10000000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use treasury_core::{NetworkId, PlutusData};

use crate::error::{Result, TreasuryError};

/// How `execute` weighs the allowance against the requested amount
///
/// The deployed validator accepts a withdrawal when quorum is met *or* the
/// amount is above the allowance. That reads as an inverted comparison, so the
/// conventional rule (small amounts skip quorum) is available as well. The
/// rule is not a script parameter and never changes the treasury identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowanceRule {
    /// `signers >= threshold || amount > allowance`, as deployed
    #[default]
    AsDeployed,
    /// `signers >= threshold || amount <= allowance`
    QuorumAboveAllowance,
}

/// Immutable treasury parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Minimum number of distinct owner approvals
    pub threshold: u64,
    /// Lovelace ceiling separating restricted and unrestricted disbursement
    pub allowance: u64,
    #[serde(default)]
    pub allowance_rule: AllowanceRule,
}

impl TreasuryConfig {
    pub fn new(threshold: u64, allowance: u64) -> Result<Self> {
        let config = Self {
            threshold,
            allowance,
            allowance_rule: AllowanceRule::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_allowance_rule(mut self, rule: AllowanceRule) -> Self {
        self.allowance_rule = rule;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(TreasuryError::Config(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.allowance > i64::MAX as u64 {
            return Err(TreasuryError::Config(format!(
                "allowance {} is out of range",
                self.allowance
            )));
        }
        Ok(())
    }

    /// Script parameters, in the order the validators expect them
    pub fn script_params(&self) -> Vec<PlutusData> {
        vec![
            PlutusData::int(self.threshold),
            PlutusData::int(self.allowance),
        ]
    }

    pub fn quorum_met(&self, signers: usize) -> bool {
        signers as u64 >= self.threshold
    }

    /// Guard for `execute`
    pub fn execute_permitted(&self, signers: usize, amount: u64) -> bool {
        if self.quorum_met(signers) {
            return true;
        }
        match self.allowance_rule {
            AllowanceRule::AsDeployed => amount > self.allowance,
            AllowanceRule::QuorumAboveAllowance => amount <= self.allowance,
        }
    }

    /// Guard for `end`
    pub fn end_permitted(&self, signers: usize, balance: u64) -> bool {
        balance <= self.allowance && self.quorum_met(signers)
    }
}

/// Ledger network the treasury lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub fn network_id(&self) -> NetworkId {
        match self {
            Network::Mainnet => NetworkId::Mainnet,
            Network::Preprod | Network::Preview => NetworkId::Testnet,
        }
    }
}

/// Blueprint titles of the two treasury validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorTitles {
    pub mint: String,
    pub spend: String,
}

impl Default for ValidatorTitles {
    fn default() -> Self {
        Self {
            mint: "identity_factory.identity_factory.mint".to_string(),
            spend: "multisig_treasury.multisig_treasury.spend".to_string(),
        }
    }
}

/// Settings file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub network: Network,
    /// Path to the compiled validator blueprint (`plutus.json`)
    pub blueprint: PathBuf,
    pub treasury: TreasuryConfig,
    #[serde(default)]
    pub validators: ValidatorTitles,
}

impl Settings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(contents).map_err(|e| TreasuryError::Config(e.to_string()))?;
        settings.treasury.validate()?;
        Ok(settings)
    }

    /// Load settings; a relative blueprint path resolves against the file's directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            TreasuryError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&contents)?;
        if settings.blueprint.is_relative() {
            if let Some(dir) = path.parent() {
                settings.blueprint = dir.join(&settings.blueprint);
            }
        }
        log::info!(
            "Loaded treasury settings from {} (network {:?}, threshold {}, allowance {})",
            path.display(),
            settings.network,
            settings.treasury.threshold,
            settings.treasury.allowance
        );
        Ok(settings)
    }
}
