//! Treasury error types

use thiserror::Error;
use treasury_core::CoreError;

/// Broad failure classes, used by callers to decide what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request breaks the treasury's rules; never retried
    PolicyViolation,
    /// The expected treasury record is not on the ledger
    StateNotFound,
    /// Persisted state or ledger data could not be read
    DecodeError,
    /// A wallet resource (collateral, funds) is missing
    ResourceUnavailable,
    /// An external collaborator failed
    Collaborator,
    /// Settings, blueprint or script problems
    Configuration,
}

/// Treasury errors
#[derive(Error, Debug)]
pub enum TreasuryError {
    #[error("Insufficient approvals: {signers} of {threshold} required signatures")]
    InsufficientApprovals { signers: usize, threshold: u64 },

    #[error("Allowance exceeded: balance {balance}, allowance {allowance}")]
    AllowanceExceeded { balance: u64, allowance: u64 },

    #[error("Owner has already signed: {0}")]
    AlreadySigned(String),

    #[error("Not an owner of this treasury: {0}")]
    NotAnOwner(String),

    #[error("Address has no payment key to sign with: {0}")]
    NoPaymentKey(String),

    #[error("Treasury already exists: {0}")]
    AlreadyExists(String),

    #[error("Treasury not found: {0}")]
    TreasuryNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient treasury balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("A treasury needs at least one owner")]
    EmptyOwners,

    #[error("Duplicate owner: {0}")]
    DuplicateOwner(String),

    #[error("Datum decode error at {field}: {reason}")]
    DatumDecode { field: String, reason: String },

    #[error("Invalid treasury record: {0}")]
    InvalidRecord(String),

    #[error("No UTxO qualifies as collateral")]
    NoCollateralAvailable,

    #[error("No UTxOs found in wallet")]
    NoWalletFunds,

    #[error("Ledger service error: {0}")]
    Ledger(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Blueprint error: {0}")]
    Blueprint(String),

    #[error("{0} validator not found")]
    ValidatorNotFound(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TreasuryError {
    pub fn datum(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TreasuryError::DatumDecode {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TreasuryError::InsufficientApprovals { .. }
            | TreasuryError::AllowanceExceeded { .. }
            | TreasuryError::AlreadySigned(_)
            | TreasuryError::NotAnOwner(_)
            | TreasuryError::NoPaymentKey(_)
            | TreasuryError::AlreadyExists(_)
            | TreasuryError::InvalidAmount(_)
            | TreasuryError::InsufficientBalance { .. }
            | TreasuryError::EmptyOwners
            | TreasuryError::DuplicateOwner(_) => ErrorCategory::PolicyViolation,
            TreasuryError::TreasuryNotFound(_) => ErrorCategory::StateNotFound,
            TreasuryError::DatumDecode { .. }
            | TreasuryError::InvalidRecord(_)
            | TreasuryError::Core(_) => ErrorCategory::DecodeError,
            TreasuryError::NoCollateralAvailable | TreasuryError::NoWalletFunds => {
                ErrorCategory::ResourceUnavailable
            }
            TreasuryError::Ledger(_) => ErrorCategory::Collaborator,
            TreasuryError::Config(_)
            | TreasuryError::Blueprint(_)
            | TreasuryError::ValidatorNotFound(_)
            | TreasuryError::Script(_) => ErrorCategory::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, TreasuryError>;
