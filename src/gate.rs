//! Access gate - orchestrates the 402 negotiation per request.
//!
//! Each request moves through a small state machine:
//!
//! ```text
//! START ─ free resource ────────────────────────▶ GRANT (200)
//!   │
//!   ├─ priced, no proof ─────────────────────────▶ 402 requirement
//!   │
//!   └─ priced, proof ──▶ VERIFYING
//!            │
//!            ├─ unverified / verifier error / replay ─▶ 402 requirement
//!            │
//!            └─ verified ──▶ SETTLING ──▶ GRANT (200 + settlement)
//! ```
//!
//! The gate is fail-closed (verifier faults re-emit the requirement) and
//! commit-before-release (content bytes are returned only after the ledger
//! write succeeds).

use crate::chains::Chain;
use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::event::{create_event_channel, GateEvent, GateEventsChannel, GateEventsSender};
use crate::ledger::{Settlement, SettlementLedger};
use crate::proof::{extract_proof, HeaderLookup};
use crate::replay::ReplayGuard;
use crate::requirement::{display_price, PaymentRequired, RequirementBuilder, RequirementOptions};
use crate::resource::{ContentStore, PriceableResource};
use crate::verify::{ProofVerifier, VerificationResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settlement summary returned to the orchestrating caller on a paid grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    /// Always true for a recorded settlement.
    pub ok: bool,
    /// Platform share in cents.
    #[serde(rename = "platformCents")]
    pub platform_cents: u64,
    /// Payee (vendor) share in cents.
    #[serde(rename = "vendorCents")]
    pub vendor_cents: u64,
    /// Settlement reference.
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

/// Outcome of one content-access request.
#[derive(Debug, Clone)]
pub enum AccessOutcome {
    /// Content released. `settlement` is present on the paid path.
    Granted {
        /// The released content bytes.
        content: Bytes,
        /// Settlement summary, when a payment accompanied the grant.
        settlement: Option<SettlementSummary>,
    },
    /// Payment required or proof rejected; a fresh 402 descriptor.
    PaymentRequired(PaymentRequired),
}

impl AccessOutcome {
    /// HTTP status code this outcome maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Granted { .. } => 200,
            Self::PaymentRequired(required) => required.status,
        }
    }

    /// Whether content was released.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Minimum accepted tip, in cents.
pub const MIN_TIP_CENTS: u64 = 1;
/// Maximum accepted tip, in cents ($5).
pub const MAX_TIP_CENTS: u64 = 500;

/// Recipient of a tip. When absent, the platform keeps the full amount.
#[derive(Debug, Clone, Default)]
pub struct TipRecipient {
    /// Recipient identifier credited in the ledger.
    pub id: String,
    /// Display name used in the 402 description.
    pub display_name: Option<String>,
    /// Recipient EVM wallet.
    pub wallet_evm: Option<String>,
    /// Recipient Solana wallet.
    pub wallet_solana: Option<String>,
}

/// A payer-chosen tip, settled without releasing any content.
#[derive(Debug, Clone, Default)]
pub struct TipRequest {
    /// Tip amount in cents, bounded by [`MIN_TIP_CENTS`] and
    /// [`MAX_TIP_CENTS`].
    pub amount_cents: u64,
    /// Recipient, or the platform when absent.
    pub recipient: Option<TipRecipient>,
    /// Preferred chain family for the descriptor and wallet resolution.
    pub preferred_chain: Option<Chain>,
}

/// Summary returned for an accepted tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipSummary {
    /// Always true for a recorded tip.
    pub ok: bool,
    /// Tipped amount in cents.
    #[serde(rename = "amountCents")]
    pub amount_cents: u64,
    /// Chain the tip settled on.
    pub chain: Chain,
    /// Settlement reference.
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

/// Outcome of one tip request.
#[derive(Debug, Clone)]
pub enum TipOutcome {
    /// Tip verified and recorded.
    Accepted(TipSummary),
    /// Payment required or proof rejected; a fresh 402 descriptor.
    PaymentRequired(PaymentRequired),
}

impl TipOutcome {
    /// HTTP status code this outcome maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Accepted(_) => 200,
            Self::PaymentRequired(required) => required.status,
        }
    }
}

/// Orchestrates payment-gated content access.
pub struct AccessGate {
    config: GateConfig,
    verifier: Arc<dyn ProofVerifier>,
    ledger: Arc<dyn SettlementLedger>,
    content: Arc<dyn ContentStore>,
    replay: ReplayGuard,
    events_tx: GateEventsSender,
}

impl AccessGate {
    /// Create a new access gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(
        config: GateConfig,
        verifier: Arc<dyn ProofVerifier>,
        ledger: Arc<dyn SettlementLedger>,
        content: Arc<dyn ContentStore>,
    ) -> Result<Self> {
        config.validate()?;
        let replay = ReplayGuard::with_capacity(config.replay_capacity);
        let (events_tx, _events_rx) = create_event_channel();

        info!(
            "access gate initialized (fee_percent={}, strict_verify={}, testnet={})",
            config.fee_percent, config.strict_verify, config.testnet
        );

        Ok(Self {
            config,
            verifier,
            ledger,
            content,
            replay,
            events_tx,
        })
    }

    /// Subscribe to gate events.
    #[must_use]
    pub fn subscribe_events(&self) -> GateEventsChannel {
        self.events_tx.subscribe()
    }

    /// The gate's configuration.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Replay guard statistics.
    #[must_use]
    pub fn replay_stats(&self) -> crate::replay::GuardStats {
        self.replay.stats()
    }

    /// Handle one content-access request.
    ///
    /// * Free resources grant immediately; the proof header is never
    ///   consulted.
    /// * Priced resources without a valid proof receive a 402 descriptor.
    /// * A verified proof settles once: the ledger write commits before any
    ///   content byte is released, and a replayed settlement reference
    ///   re-emits the 402 instead of minting a second record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingContent`] when the content store has nothing
    /// for the resource, or [`Error::Ledger`] when the settlement write
    /// fails (the caller must surface this as a server error, not a grant).
    pub async fn handle(
        &self,
        resource: &PriceableResource,
        headers: &impl HeaderLookup,
        payer: Option<&str>,
    ) -> Result<AccessOutcome> {
        if resource.is_free() {
            let content = self.fetch_content(resource).await?;
            self.ledger.record_access(&resource.id).await?;
            debug!("free resource {} granted", resource.id);
            let _ = self.events_tx.send(GateEvent::AccessGranted {
                resource: resource.id.clone(),
                paid: false,
            });
            return Ok(AccessOutcome::Granted {
                content,
                settlement: None,
            });
        }

        let Some(proof) = extract_proof(headers) else {
            debug!("no proof header for priced resource {}", resource.id);
            return self.payment_required(resource);
        };

        let required = self.build_requirement(resource)?;
        let result = match self.verifier.verify(&proof, &required.body).await {
            Ok(result) => result,
            Err(e) => {
                // Fail-closed: a verifier fault is an unverified proof.
                warn!("verifier error for resource {}: {e}", resource.id);
                let _ = self.events_tx.send(GateEvent::Error {
                    message: e.to_string(),
                });
                VerificationResult::unverified()
            }
        };

        if !result.verified {
            debug!("proof rejected for resource {}", resource.id);
            return self.payment_required(resource);
        }

        let chain = result.chain.unwrap_or(Chain::Evm);
        let Some(reference) = result.settlement_reference else {
            warn!(
                "verified result without settlement reference for resource {}; treating as \
                 unverified",
                resource.id
            );
            return self.payment_required(resource);
        };

        if self.replay.contains(&reference) {
            warn!("replayed settlement reference {reference} rejected");
            let _ = self
                .events_tx
                .send(GateEvent::ReplayRejected {
                    reference: reference.clone(),
                });
            return self.payment_required(resource);
        }

        let _ = self.events_tx.send(GateEvent::PaymentVerified {
            resource: resource.id.clone(),
            reference: reference.clone(),
        });

        // Fetch before the ledger write (no side effect), release after.
        let content = self.fetch_content(resource).await?;

        let settlement = Settlement::new(
            resource.id.clone(),
            payer,
            resource.owner.clone(),
            resource.price_cents,
            self.config.fee_percent,
            chain,
            reference.clone(),
        );
        let platform_cents = settlement.platform_cents;
        let vendor_cents = settlement.payee_cents;

        match self.ledger.record(settlement).await {
            Ok(()) => {}
            Err(Error::DuplicateSettlement(duplicate)) => {
                warn!("settlement reference {duplicate} already recorded");
                self.replay.insert(duplicate.clone());
                let _ = self
                    .events_tx
                    .send(GateEvent::ReplayRejected { reference: duplicate });
                return self.payment_required(resource);
            }
            Err(e) => {
                // No content release on a failed commit.
                let _ = self.events_tx.send(GateEvent::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        }
        self.replay.insert(reference.clone());

        info!(
            "settled {} cents for resource {} on {chain} (platform={platform_cents}, \
             vendor={vendor_cents})",
            resource.price_cents, resource.id
        );
        let _ = self.events_tx.send(GateEvent::SettlementRecorded {
            resource: resource.id.clone(),
            reference: reference.clone(),
            payee_cents: vendor_cents,
        });
        let _ = self.events_tx.send(GateEvent::AccessGranted {
            resource: resource.id.clone(),
            paid: true,
        });

        Ok(AccessOutcome::Granted {
            content,
            settlement: Some(SettlementSummary {
                ok: true,
                platform_cents,
                vendor_cents,
                tx_hash: reference,
            }),
        })
    }

    /// Handle one tip request.
    ///
    /// Tips settle without gating any content and bypass the platform fee
    /// split: a recipient tip credits the recipient with the full amount,
    /// and a platform tip keeps everything on the platform side. The wallet
    /// on the preferred chain comes from the recipient when they have one
    /// configured, otherwise from the platform. Replay handling matches
    /// [`AccessGate::handle`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequirement`] when the amount falls outside
    /// the tip bounds, or [`Error::Ledger`] when the settlement write fails.
    pub async fn handle_tip(
        &self,
        tip: &TipRequest,
        headers: &impl HeaderLookup,
        payer: Option<&str>,
    ) -> Result<TipOutcome> {
        if tip.amount_cents < MIN_TIP_CENTS || tip.amount_cents > MAX_TIP_CENTS {
            return Err(Error::InvalidRequirement(format!(
                "tip amount must be between {} and {}",
                display_price(MIN_TIP_CENTS),
                display_price(MAX_TIP_CENTS)
            )));
        }

        let recipient_name = tip.recipient.as_ref().map_or_else(
            || "platform".to_string(),
            |r| r.display_name.clone().unwrap_or_else(|| r.id.clone()),
        );
        let description = format!(
            "Tip {} to {recipient_name}",
            display_price(tip.amount_cents)
        );
        let tip_id = tip
            .recipient
            .as_ref()
            .map_or_else(|| "tip:platform".to_string(), |r| format!("tip:{}", r.id));

        let preferred = tip.preferred_chain.unwrap_or(self.config.preferred_chain);
        let mut options = RequirementOptions {
            preferred_chain: Some(preferred),
            ..RequirementOptions::default()
        };
        if let Some(ref recipient) = tip.recipient {
            // Only the preferred chain's wallet comes from the recipient;
            // the other entries fall back to the platform wallets.
            match preferred {
                Chain::Evm => options.pay_to_evm = recipient.wallet_evm.clone(),
                Chain::Solana => options.pay_to_solana = recipient.wallet_solana.clone(),
            }
        }

        let builder = RequirementBuilder::new(&self.config);
        let required = builder.build(tip.amount_cents, &description, &options)?;

        let Some(proof) = extract_proof(headers) else {
            debug!("no proof header for tip {tip_id}");
            let _ = self.events_tx.send(GateEvent::RequirementEmitted {
                resource: tip_id,
                amount_cents: required.body.amount_cents,
            });
            return Ok(TipOutcome::PaymentRequired(required));
        };

        let result = match self.verifier.verify(&proof, &required.body).await {
            Ok(result) => result,
            Err(e) => {
                warn!("verifier error for tip {tip_id}: {e}");
                let _ = self.events_tx.send(GateEvent::Error {
                    message: e.to_string(),
                });
                VerificationResult::unverified()
            }
        };

        let chain = result.chain.unwrap_or(Chain::Evm);
        let reference = match (result.verified, result.settlement_reference) {
            (true, Some(reference)) => reference,
            _ => {
                debug!("proof rejected for tip {tip_id}");
                let _ = self.events_tx.send(GateEvent::RequirementEmitted {
                    resource: tip_id,
                    amount_cents: required.body.amount_cents,
                });
                return Ok(TipOutcome::PaymentRequired(required));
            }
        };

        if self.replay.contains(&reference) {
            warn!("replayed settlement reference {reference} rejected");
            let _ = self
                .events_tx
                .send(GateEvent::ReplayRejected { reference });
            return Ok(TipOutcome::PaymentRequired(required));
        }

        let _ = self.events_tx.send(GateEvent::PaymentVerified {
            resource: tip_id.clone(),
            reference: reference.clone(),
        });

        // A recipient tip forwards everything; a platform tip keeps it.
        let fee_percent = if tip.recipient.is_some() { 0 } else { 100 };
        let settlement = Settlement::new(
            tip_id.clone(),
            payer,
            tip.recipient.as_ref().map(|r| r.id.clone()),
            tip.amount_cents,
            fee_percent,
            chain,
            reference.clone(),
        );
        let payee_cents = settlement.payee_cents;

        match self.ledger.record(settlement).await {
            Ok(()) => {}
            Err(Error::DuplicateSettlement(duplicate)) => {
                warn!("settlement reference {duplicate} already recorded");
                self.replay.insert(duplicate.clone());
                let _ = self
                    .events_tx
                    .send(GateEvent::ReplayRejected { reference: duplicate });
                return Ok(TipOutcome::PaymentRequired(required));
            }
            Err(e) => {
                let _ = self.events_tx.send(GateEvent::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        }
        self.replay.insert(reference.clone());

        info!(
            "tipped {} cents to {recipient_name} on {chain}",
            tip.amount_cents
        );
        let _ = self.events_tx.send(GateEvent::SettlementRecorded {
            resource: tip_id,
            reference: reference.clone(),
            payee_cents,
        });

        Ok(TipOutcome::Accepted(TipSummary {
            ok: true,
            amount_cents: tip.amount_cents,
            chain,
            tx_hash: reference,
        }))
    }

    async fn fetch_content(&self, resource: &PriceableResource) -> Result<Bytes> {
        self.content
            .fetch(&resource.id)
            .await?
            .ok_or_else(|| Error::MissingContent(resource.id.clone()))
    }

    fn build_requirement(&self, resource: &PriceableResource) -> Result<PaymentRequired> {
        let builder = RequirementBuilder::new(&self.config);
        let description = if resource.description.trim().is_empty() {
            // Recover locally: the 402 must stay well-formed even for a
            // resource with no description.
            format!("Access {}", resource.id)
        } else {
            resource.description.clone()
        };
        builder.build(
            resource.price_cents,
            &description,
            &RequirementOptions::for_resource(resource),
        )
    }

    fn payment_required(&self, resource: &PriceableResource) -> Result<AccessOutcome> {
        let required = self.build_requirement(resource)?;
        let _ = self.events_tx.send(GateEvent::RequirementEmitted {
            resource: resource.id.clone(),
            amount_cents: required.body.amount_cents,
        });
        Ok(AccessOutcome::PaymentRequired(required))
    }
}
