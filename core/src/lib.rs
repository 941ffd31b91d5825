//! Multisig Treasury Core Library
//!
//! Ledger primitives shared by the treasury crate: hashes, Shelley
//! addresses, Plutus data and its CBOR form, UTxO and value types.

pub mod address;
pub mod error;
pub mod hash;
pub mod plutus_data;
pub mod utxo;

pub use address::{decode_payment_and_stake, encode_credential, Address, Credential, NetworkId};
pub use error::{CoreError, Result};
pub use hash::{blake2b_224, blake2b_256, Hash28, HASH28_LEN};
pub use plutus_data::PlutusData;
pub use utxo::{
    Asset, AssetUnit, OutPoint, TxOutput, Utxo, Value, LOVELACE, LOVELACE_PER_ADA,
    MAX_ASSET_NAME_LEN,
};
