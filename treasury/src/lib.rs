//! Multisig Treasury
//!
//! A shared fund locked at a script address, released to a fixed receiver
//! once enough owners approve. One ledger record per treasury carries the
//! locked lovelace, an identity token and the state datum:
//! - `receiver`: destination of every disbursement
//! - `owners`: approvers, fixed at creation
//! - `signers`: owners who approved the pending disbursement
//!
//! [`machine`] plans transitions as pure functions; [`client::TreasuryClient`]
//! drives them against the ledger and wallet collaborators in [`ledger`].

pub mod blueprint;
pub mod client;
pub mod collateral;
pub mod config;
pub mod datum;
pub mod error;
pub mod flat;
pub mod identity;
pub mod ledger;
pub mod machine;
pub mod plan;

pub use blueprint::Blueprint;
pub use client::{OpenTreasury, TreasuryClient};
pub use collateral::{select_collateral, MIN_COLLATERAL_LOVELACE};
pub use config::{AllowanceRule, Network, Settings, TreasuryConfig, ValidatorTitles};
pub use datum::TreasuryState;
pub use error::{ErrorCategory, Result, TreasuryError};
pub use flat::{PlutusScript, PlutusVersion};
pub use identity::{TreasuryIdentity, TreasuryInstance};
pub use ledger::{LedgerQuery, TransactionBuilder, WalletService};
pub use machine::{Bootstrap, TreasurySnapshot, TxContext};
pub use plan::{MintRedeemer, PlanKind, SpendRedeemer, TransactionPlan};
