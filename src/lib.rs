//! HTTP 402 payment-requirement negotiation and settlement gating.
//!
//! `x402-gate` implements the x402 convention for premium content: a priced
//! resource answers unpaid requests with a machine-readable 402 descriptor
//! of acceptable payment methods, and releases content once a
//! proof-of-payment header verifies - settling the proceeds between the
//! platform and the content owner exactly once per proof.
//!
//! # Architecture
//!
//! ```text
//! access request received
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ resource free?      │──yes──▶ release content
//! └─────────┬───────────┘
//!           │ no
//!           ▼
//! ┌─────────────────────┐
//! │ proof header?       │──no───▶ 402 + PaymentRequirement
//! └─────────┬───────────┘
//!           │ yes
//!           ▼
//! ┌─────────────────────┐
//! │ facilitator verify  │──rejected/timeout──▶ 402 (fail-closed)
//! └─────────┬───────────┘
//!           │ verified
//!           ▼
//! ┌─────────────────────┐
//! │ ledger settlement   │──duplicate ref─────▶ 402 (replay)
//! │ (atomic, idempotent)│──write failure─────▶ server error, no release
//! └─────────┬───────────┘
//!           │ committed
//!           ▼
//!   release content + settlement summary
//! ```
//!
//! The persistence layer, identity provider, and HTTP routing are external
//! collaborators behind the [`SettlementLedger`](ledger::SettlementLedger),
//! [`ContentStore`](resource::ContentStore), and
//! [`HeaderLookup`](proof::HeaderLookup) seams.

pub mod chains;
pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod ledger;
pub mod proof;
pub mod replay;
pub mod requirement;
pub mod resource;
pub mod verify;

pub use chains::Chain;
pub use config::GateConfig;
pub use error::{Error, Result};
pub use gate::{
    AccessGate, AccessOutcome, SettlementSummary, TipOutcome, TipRecipient, TipRequest,
    TipSummary, MAX_TIP_CENTS, MIN_TIP_CENTS,
};
pub use ledger::{split_fee, FeeSplit, MemoryLedger, Settlement, SettlementLedger};
pub use proof::{extract_proof, HeaderLookup, ProofOfPayment};
pub use replay::ReplayGuard;
pub use requirement::{
    AcceptedMethod, PaymentRequired, PaymentRequirement, RequirementBuilder, RequirementOptions,
};
pub use resource::{ContentStore, MemoryContent, PriceableResource};
pub use verify::{FacilitatorConfig, FacilitatorVerifier, ProofVerifier, VerificationResult};
