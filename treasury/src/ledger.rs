//! Interfaces to the ledger network, the caller's wallet and the transaction builder
//!
//! Implementations live outside this crate. Collaborator failures are reported
//! as [`TreasuryError::Ledger`](crate::error::TreasuryError::Ledger).

use async_trait::async_trait;
use treasury_core::{Address, AssetUnit, Utxo};

use crate::error::Result;
use crate::plan::TransactionPlan;

/// Read access to the ledger's UTxO set
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// The UTxO at `address` holding `unit`; when several match, the last one reported
    async fn fetch_record(&self, address: &Address, unit: &AssetUnit) -> Result<Option<Utxo>>;

    /// Every UTxO at `address`
    async fn fetch_all_funds(&self, address: &Address) -> Result<Vec<Utxo>>;
}

/// The caller's wallet
#[async_trait]
pub trait WalletService: Send + Sync {
    async fn get_funds(&self) -> Result<Vec<Utxo>>;

    async fn get_change_address(&self) -> Result<Address>;

    /// A collateral UTxO, created by the wallet if it has none
    async fn get_or_create_collateral(&self) -> Result<Utxo>;
}

/// Assembles a plan into whatever the caller signs and submits
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    type Artifact: Send;

    async fn build(&self, plan: &TransactionPlan) -> Result<Self::Artifact>;
}
