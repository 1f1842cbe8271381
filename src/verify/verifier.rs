//! Verifier trait and verification results.

use crate::chains::Chain;
use crate::proof::ProofOfPayment;
use crate::requirement::PaymentRequirement;
use serde::{Deserialize, Serialize};

/// Outcome of a single verification call.
///
/// Produced fresh per call and never cached: a result is only meaningful
/// for the request that carried the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the proof represents a valid, completed payment.
    pub verified: bool,
    /// Chain the payment settled on. Present only when verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    /// External settlement/transaction reference. Present only when
    /// verified.
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub settlement_reference: Option<String>,
}

impl VerificationResult {
    /// A verified payment with its chain and settlement reference.
    #[must_use]
    pub fn settled(chain: Chain, reference: impl Into<String>) -> Self {
        Self {
            verified: true,
            chain: Some(chain),
            settlement_reference: Some(reference.into()),
        }
    }

    /// An unverified (rejected or unverifiable) payment.
    #[must_use]
    pub fn unverified() -> Self {
        Self {
            verified: false,
            chain: None,
            settlement_reference: None,
        }
    }
}

/// Decides whether a proof token represents a valid, completed payment for
/// the given requirement.
///
/// Implementations must be fail-closed: an unreachable or slow backend is
/// reported as an unverified result, not an error that could be confused
/// with a server fault.
#[async_trait::async_trait]
pub trait ProofVerifier: Send + Sync {
    /// Verify a proof against the requirement it should settle.
    ///
    /// # Errors
    ///
    /// Returns an error only for faults the verifier cannot express as an
    /// unverified result. The gate treats such errors as unverified anyway.
    async fn verify(
        &self,
        proof: &ProofOfPayment,
        requirement: &PaymentRequirement,
    ) -> crate::Result<VerificationResult>;
}
