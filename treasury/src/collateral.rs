//! Collateral selection for script transactions

use treasury_core::{Utxo, LOVELACE_PER_ADA};

use crate::error::{Result, TreasuryError};

/// Smallest lovelace amount accepted as collateral (5 ADA)
pub const MIN_COLLATERAL_LOVELACE: u64 = 5 * LOVELACE_PER_ADA;

/// A UTxO can back a script transaction when it holds only lovelace, enough of it
pub fn is_collateral_candidate(utxo: &Utxo) -> bool {
    let amount = &utxo.output.amount;
    amount.is_pure_lovelace() && amount.lovelace() >= MIN_COLLATERAL_LOVELACE
}

/// Pick the first qualifying UTxO, in the order given
///
/// Selection never creates collateral; when nothing qualifies the wallet
/// service has to produce a new one.
pub fn select_collateral(utxos: &[Utxo]) -> Result<&Utxo> {
    utxos
        .iter()
        .find(|utxo| is_collateral_candidate(utxo))
        .ok_or(TreasuryError::NoCollateralAvailable)
}
