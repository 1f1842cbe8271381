//! Proof-of-payment verification.
//!
//! The gate treats verification as a single swappable function boundary:
//! a [`ProofVerifier`] takes the proof token and the requirement it is
//! supposed to settle, and answers with a [`VerificationResult`]. The
//! production implementation, [`FacilitatorVerifier`], delegates the verdict
//! to an external facilitator service.
//!
//! ```text
//! proof + requirement
//!        │
//!        ▼
//! ┌──────────────────┐  strict   ┌──────────────────────┐
//! │ FacilitatorVerifier ├──────────▶ POST <base>/verify   │
//! └────────┬─────────┘           └──────────┬───────────┘
//!          │ dev mode                       │
//!          ▼                                ▼
//!  accept non-empty proof        facilitator verdict
//!  (logged as insecure)          (timeout ⇒ unverified)
//! ```

mod facilitator;
mod verifier;

pub use facilitator::{FacilitatorConfig, FacilitatorVerifier};
pub use verifier::{ProofVerifier, VerificationResult};
