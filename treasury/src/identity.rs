//! Treasury identity derivation
//!
//! A treasury's identity is fixed by its configuration: both validators are
//! parameterized with `[threshold, allowance]`, the minting policy id is the
//! hash of the applied mint script and the record lives at the enterprise
//! script address of the applied spend script.

use treasury_core::{Address, AssetUnit, Hash28, NetworkId};

use crate::blueprint::Blueprint;
use crate::config::{Settings, TreasuryConfig};
use crate::error::Result;
use crate::flat::PlutusScript;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryIdentity {
    config: TreasuryConfig,
    network: NetworkId,
    mint_script: PlutusScript,
    spend_script: PlutusScript,
    policy_id: Hash28,
    spend_address: Address,
}

impl TreasuryIdentity {
    /// Apply the config to both validator templates and hash the results
    pub fn derive(
        config: TreasuryConfig,
        mint_template: &PlutusScript,
        spend_template: &PlutusScript,
        network: NetworkId,
    ) -> Result<Self> {
        config.validate()?;
        let params = config.script_params();
        let mint_script = mint_template.apply_params(&params)?;
        let spend_script = spend_template.apply_params(&params)?;
        let policy_id = mint_script.hash();
        let spend_address = Address::script(network, spend_script.hash());

        Ok(Self {
            config,
            network,
            mint_script,
            spend_script,
            policy_id,
            spend_address,
        })
    }

    /// Derive from a loaded blueprint using the validator titles in `settings`
    pub fn from_blueprint(settings: &Settings, blueprint: &Blueprint) -> Result<Self> {
        let version = blueprint.plutus_version()?;
        let mint = PlutusScript::from_cbor_hex(version, blueprint.validator(&settings.validators.mint)?)?;
        let spend =
            PlutusScript::from_cbor_hex(version, blueprint.validator(&settings.validators.spend)?)?;
        Self::derive(settings.treasury, &mint, &spend, settings.network.network_id())
    }

    /// Load the blueprint named in `settings` and derive from it
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let blueprint = Blueprint::load(&settings.blueprint)?;
        let identity = Self::from_blueprint(settings, &blueprint)?;
        log::info!(
            "Treasury policy {} at {}",
            identity.policy_id,
            identity.spend_address
        );
        Ok(identity)
    }

    pub fn config(&self) -> &TreasuryConfig {
        &self.config
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn policy_id(&self) -> &Hash28 {
        &self.policy_id
    }

    pub fn spend_address(&self) -> &Address {
        &self.spend_address
    }

    pub fn mint_script(&self) -> &PlutusScript {
        &self.mint_script
    }

    pub fn spend_script(&self) -> &PlutusScript {
        &self.spend_script
    }

    /// Name one treasury under this identity
    pub fn instance(&self, name: impl Into<Vec<u8>>) -> TreasuryInstance {
        TreasuryInstance {
            identity: self.clone(),
            name: name.into(),
        }
    }
}

/// One treasury: an identity plus the asset name of its token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryInstance {
    pub identity: TreasuryIdentity,
    pub name: Vec<u8>,
}

impl TreasuryInstance {
    /// Identity token unit (`policy id ‖ name`)
    pub fn unit(&self) -> AssetUnit {
        AssetUnit::token(self.identity.policy_id, self.name.clone())
    }

    pub fn config(&self) -> &TreasuryConfig {
        self.identity.config()
    }

    /// Human-readable label, hex when the name is not UTF-8
    pub fn label(&self) -> String {
        match std::str::from_utf8(&self.name) {
            Ok(s) => s.to_string(),
            Err(_) => hex::encode(&self.name),
        }
    }
}
