//! Transaction plans handed to the external builder

use serde::{Deserialize, Serialize};
use treasury_core::{Address, Hash28, NetworkId, PlutusData, Utxo, Value};

use crate::datum::TreasuryState;
use crate::flat::PlutusScript;

/// Spend validator redeemer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendRedeemer {
    Deposit,
    Sign,
    Execute,
    End,
}

impl SpendRedeemer {
    pub fn to_data(self) -> PlutusData {
        let tag = match self {
            SpendRedeemer::Deposit => 0,
            SpendRedeemer::Sign => 1,
            SpendRedeemer::Execute => 2,
            SpendRedeemer::End => 3,
        };
        PlutusData::constr(tag, vec![])
    }
}

/// Minting policy redeemer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintRedeemer {
    Mint,
    Burn,
}

impl MintRedeemer {
    pub fn to_data(self) -> PlutusData {
        match self {
            MintRedeemer::Mint => PlutusData::constr(0, vec![]),
            MintRedeemer::Burn => PlutusData::constr(1, vec![]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    Init,
    Deposit,
    Sign,
    Execute,
    End,
}

/// Treasury record consumed by the transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInput {
    pub utxo: Utxo,
    pub redeemer: SpendRedeemer,
    pub script: PlutusScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub address: Address,
    pub value: Value,
    /// Inline datum, present on treasury records
    pub datum: Option<PlutusData>,
}

/// Identity token mint (positive) or burn (negative)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEntry {
    pub policy_id: Hash28,
    pub name: Vec<u8>,
    pub quantity: i64,
    pub redeemer: MintRedeemer,
    pub script: PlutusScript,
}

/// Everything a builder needs to assemble, balance and sign one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    pub kind: PlanKind,
    pub script_inputs: Vec<ScriptInput>,
    pub outputs: Vec<PlannedOutput>,
    pub mints: Vec<MintEntry>,
    /// Key hash whose signature the transaction must carry
    pub required_signer: Option<Hash28>,
    pub collateral: Utxo,
    /// Wallet UTxOs available for coin selection
    pub wallet_utxos: Vec<Utxo>,
    pub change_address: Address,
    pub network: NetworkId,
    /// State of the record after this transition, `None` once closed
    pub new_state: Option<TreasuryState>,
}

impl TransactionPlan {
    /// Treasury record output, if the transition keeps the treasury open
    pub fn record_output(&self) -> Option<&PlannedOutput> {
        self.outputs.iter().find(|o| o.datum.is_some())
    }

    /// Lovelace paid to `address` by this plan
    pub fn paid_to(&self, address: &Address) -> u64 {
        self.outputs
            .iter()
            .filter(|o| &o.address == address && o.datum.is_none())
            .map(|o| o.value.lovelace())
            .sum()
    }
}
