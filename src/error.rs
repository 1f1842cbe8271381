//! Error types for x402-gate.

use thiserror::Error;

/// Errors produced by the payment gate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input to the requirement builder (non-positive amount or
    /// empty description).
    #[error("invalid payment requirement: {0}")]
    InvalidRequirement(String),

    /// Proof verification could not be performed. Note that a proof the
    /// facilitator rejects is NOT an error; it surfaces as an unverified
    /// [`VerificationResult`](crate::verify::VerificationResult).
    #[error("payment verification failed: {0}")]
    Verification(String),

    /// A settlement with the same reference was already recorded.
    #[error("duplicate settlement reference: {0}")]
    DuplicateSettlement(String),

    /// The ledger write failed. Content must not be released when this
    /// occurs.
    #[error("ledger write failed: {0}")]
    Ledger(String),

    /// The content store has no bytes for the requested resource.
    #[error("no downloadable content for resource: {0}")]
    MissingContent(String),

    /// Configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for x402-gate operations.
pub type Result<T> = std::result::Result<T, Error>;
