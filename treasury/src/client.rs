//! Async treasury client
//!
//! Ties the pure state machine to the collaborators: read the current record,
//! gather the wallet's funds and collateral, plan the transition and hand the
//! plan to the builder. Each call reads fresh ledger state; nothing is cached.

use treasury_core::{Address, AssetUnit, Utxo};

use crate::collateral::select_collateral;
use crate::error::{Result, TreasuryError};
use crate::identity::TreasuryInstance;
use crate::ledger::{LedgerQuery, TransactionBuilder, WalletService};
use crate::machine::{self, Bootstrap, TreasurySnapshot, TxContext};
use crate::plan::TransactionPlan;

/// A treasury record found at the spend address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTreasury {
    pub instance: TreasuryInstance,
    pub snapshot: TreasurySnapshot,
}

pub struct TreasuryClient<L, W, B> {
    instance: TreasuryInstance,
    ledger: L,
    wallet: W,
    builder: B,
}

impl<L, W, B> TreasuryClient<L, W, B>
where
    L: LedgerQuery,
    W: WalletService,
    B: TransactionBuilder,
{
    pub fn new(instance: TreasuryInstance, ledger: L, wallet: W, builder: B) -> Self {
        Self {
            instance,
            ledger,
            wallet,
            builder,
        }
    }

    pub fn instance(&self) -> &TreasuryInstance {
        &self.instance
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Current record, `None` when the treasury does not exist
    pub async fn snapshot(&self) -> Result<Option<TreasurySnapshot>> {
        let identity = &self.instance.identity;
        let record = self
            .ledger
            .fetch_record(identity.spend_address(), &self.instance.unit())
            .await?;
        record
            .map(|utxo| TreasurySnapshot::from_utxo(utxo, &self.instance))
            .transpose()
    }

    /// Current record, failing when the treasury does not exist
    pub async fn state(&self) -> Result<TreasurySnapshot> {
        self.snapshot()
            .await?
            .ok_or_else(|| TreasuryError::TreasuryNotFound(self.instance.label()))
    }

    /// Every readable treasury record under this identity's policy
    pub async fn open_treasuries(&self) -> Result<Vec<OpenTreasury>> {
        let identity = &self.instance.identity;
        let utxos = self.ledger.fetch_all_funds(identity.spend_address()).await?;

        let mut open = Vec::new();
        for utxo in utxos {
            let names: Vec<Vec<u8>> = utxo
                .output
                .amount
                .assets()
                .iter()
                .filter_map(|asset| match &asset.unit {
                    AssetUnit::Token { policy_id, name } if policy_id == identity.policy_id() => {
                        Some(name.clone())
                    }
                    _ => None,
                })
                .collect();

            for name in names {
                let instance = identity.instance(name);
                match TreasurySnapshot::from_utxo(utxo.clone(), &instance) {
                    Ok(snapshot) => open.push(OpenTreasury { instance, snapshot }),
                    Err(e) => log::warn!(
                        "⚠️  Skipping unreadable treasury {} at {}: {}",
                        instance.label(),
                        utxo.input,
                        e
                    ),
                }
            }
        }
        Ok(open)
    }

    /// Wallet funds, change address and collateral for the next transaction
    pub async fn context(&self) -> Result<TxContext> {
        let funds = self.wallet.get_funds().await?;
        if funds.is_empty() {
            return Err(TreasuryError::NoWalletFunds);
        }
        let collateral = self.collateral(&funds).await?;
        let change_address = self.wallet.get_change_address().await?;
        Ok(TxContext {
            wallet_utxos: funds,
            change_address,
            collateral,
            network: self.instance.identity.network(),
        })
    }

    async fn collateral(&self, funds: &[Utxo]) -> Result<Utxo> {
        match select_collateral(funds) {
            Ok(utxo) => Ok(utxo.clone()),
            Err(TreasuryError::NoCollateralAvailable) => {
                log::info!("No collateral in wallet funds, asking the wallet for one");
                self.wallet.get_or_create_collateral().await
            }
            Err(e) => Err(e),
        }
    }

    async fn submit(&self, plan: TransactionPlan) -> Result<B::Artifact> {
        log::info!(
            "Planned {:?} for treasury {} ({} outputs, {} mints)",
            plan.kind,
            self.instance.label(),
            plan.outputs.len(),
            plan.mints.len()
        );
        self.builder.build(&plan).await
    }

    pub async fn init(
        &self,
        receiver: Address,
        owners: Vec<Address>,
        amount: u64,
    ) -> Result<B::Artifact> {
        let current = self.snapshot().await?;
        let ctx = self.context().await?;
        let plan = machine::init(&self.instance, &ctx, current.as_ref(), receiver, owners, amount)?;
        self.submit(plan).await
    }

    pub async fn deposit(&self, amount: u64, bootstrap: Option<Bootstrap>) -> Result<B::Artifact> {
        let current = self.snapshot().await?;
        let ctx = self.context().await?;
        let plan = machine::deposit(&self.instance, &ctx, current.as_ref(), amount, bootstrap)?;
        self.submit(plan).await
    }

    /// Approve as the wallet's owner; the wallet's change address identifies the signer
    pub async fn sign(&self) -> Result<B::Artifact> {
        let current = self.snapshot().await?;
        let ctx = self.context().await?;
        let caller = ctx.change_address.clone();
        let plan = machine::sign(&self.instance, &ctx, current.as_ref(), &caller)?;
        self.submit(plan).await
    }

    pub async fn execute(&self, amount: u64) -> Result<B::Artifact> {
        let current = self.snapshot().await?;
        let ctx = self.context().await?;
        let plan = machine::execute(&self.instance, &ctx, current.as_ref(), amount)?;
        self.submit(plan).await
    }

    pub async fn end(&self) -> Result<B::Artifact> {
        let current = self.snapshot().await?;
        let ctx = self.context().await?;
        let plan = machine::end(&self.instance, &ctx, current.as_ref())?;
        self.submit(plan).await
    }
}
