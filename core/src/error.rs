//! Core ledger primitive errors

use thiserror::Error;

/// Errors raised by address, hash and Plutus data codecs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Invalid credential length: expected {expected} bytes, got {actual}")]
    InvalidCredentialLength { expected: usize, actual: usize },

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("CBOR decode error at byte {offset}: {reason}")]
    Cbor { offset: usize, reason: String },

    #[error("Invalid asset unit: {0}")]
    InvalidUnit(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
