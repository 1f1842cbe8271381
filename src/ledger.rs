//! Settlement records, fee splitting, and the ledger boundary.
//!
//! A verified payment is applied as one atomic unit: append the settlement
//! record, credit the payee's balance, and bump the resource's download
//! counter. The in-memory implementation guards the whole state with a
//! single mutex; persistent implementations must wrap the same steps in one
//! transaction.

use crate::chains::Chain;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Payer reference recorded when no identity accompanies the request.
pub const ANONYMOUS_PAYER: &str = "anonymous";

/// Split of a settled amount between platform and payee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Platform share in cents.
    pub platform_cents: u64,
    /// Payee share in cents.
    pub payee_cents: u64,
}

/// Split an amount by the platform fee percentage.
///
/// The platform share is the integer floor of `amount * fee / 100`; the
/// payee receives the remainder. Remainder cents from the division accrue to
/// the platform, never the payee, and the two shares always sum to the
/// amount.
#[must_use]
pub fn split_fee(amount_cents: u64, fee_percent: u8) -> FeeSplit {
    let fee = u64::from(fee_percent.min(100));
    // u128 intermediate so amount * fee cannot overflow.
    let platform_cents =
        u64::try_from(u128::from(amount_cents) * u128::from(fee) / 100).unwrap_or(amount_cents);
    FeeSplit {
        platform_cents,
        payee_cents: amount_cents - platform_cents,
    }
}

/// Status of a settlement record. Only completed settlements are persisted;
/// failed verifications never reach the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Payment verified and applied.
    Completed,
}

/// One ledger entry for a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Ledger entry identifier, derived from the settlement reference.
    pub id: String,
    /// Paying party, or [`ANONYMOUS_PAYER`].
    pub payer: String,
    /// Payee credited with the payee share, if any.
    pub payee: Option<String>,
    /// Gated resource this settlement released.
    pub resource: String,
    /// Full settled amount in cents.
    pub amount_cents: u64,
    /// Platform share in cents.
    pub platform_cents: u64,
    /// Payee share in cents.
    pub payee_cents: u64,
    /// Chain the payment settled on.
    pub chain: Chain,
    /// External settlement/transaction reference. Unique per settlement.
    pub reference: String,
    /// Settlement status.
    pub status: SettlementStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Build a completed settlement, computing the fee split and entry id.
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        payer: Option<&str>,
        payee: Option<String>,
        amount_cents: u64,
        fee_percent: u8,
        chain: Chain,
        reference: impl Into<String>,
    ) -> Self {
        let resource = resource.into();
        let reference = reference.into();
        let split = split_fee(amount_cents, fee_percent);

        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        hasher.update(resource.as_bytes());
        let digest = hasher.finalize();

        Self {
            id: format!("stl-{}", hex::encode(&digest[..6])),
            payer: payer.unwrap_or(ANONYMOUS_PAYER).to_string(),
            payee,
            resource,
            amount_cents,
            platform_cents: split.platform_cents,
            payee_cents: split.payee_cents,
            chain,
            reference,
            status: SettlementStatus::Completed,
            created_at: Utc::now(),
        }
    }
}

/// The ledger boundary the gate settles against.
///
/// `record` must be atomic: either all of its effects (entry append, payee
/// balance credit, download counter bump) happen, or none do. Persistent
/// implementations should enforce reference uniqueness with a unique
/// constraint and wrap the steps in a single transaction.
#[async_trait::async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Apply a settlement as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSettlement`](crate::Error::DuplicateSettlement)
    /// when the settlement reference was already recorded, or
    /// [`Error::Ledger`](crate::Error::Ledger) when the write fails.
    async fn record(&self, settlement: Settlement) -> crate::Result<()>;

    /// Count a free-path access (download counter only, no settlement).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`](crate::Error::Ledger) when the write fails.
    async fn record_access(&self, resource_id: &str) -> crate::Result<()>;

    /// Running balance of a payee in cents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`](crate::Error::Ledger) when the read fails.
    async fn balance(&self, payee: &str) -> crate::Result<u64>;

    /// Download/access count for a resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ledger`](crate::Error::Ledger) when the read fails.
    async fn download_count(&self, resource_id: &str) -> crate::Result<u64>;
}

#[derive(Debug, Default)]
struct LedgerState {
    settlements: Vec<Settlement>,
    references: HashSet<String>,
    balances: HashMap<String, u64>,
    downloads: HashMap<String, u64>,
}

/// In-memory ledger. One mutex over the whole state makes the multi-step
/// settlement update atomic under concurrent access.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of settlement records.
    #[must_use]
    pub fn settlement_count(&self) -> usize {
        self.inner.lock().settlements.len()
    }

    /// Snapshot of all settlement records.
    #[must_use]
    pub fn settlements(&self) -> Vec<Settlement> {
        self.inner.lock().settlements.clone()
    }
}

#[async_trait::async_trait]
impl SettlementLedger for MemoryLedger {
    async fn record(&self, settlement: Settlement) -> crate::Result<()> {
        let mut state = self.inner.lock();

        if state.references.contains(&settlement.reference) {
            return Err(crate::Error::DuplicateSettlement(settlement.reference));
        }

        state.references.insert(settlement.reference.clone());
        if let Some(ref payee) = settlement.payee {
            *state.balances.entry(payee.clone()).or_default() += settlement.payee_cents;
        }
        *state.downloads.entry(settlement.resource.clone()).or_default() += 1;
        state.settlements.push(settlement);
        Ok(())
    }

    async fn record_access(&self, resource_id: &str) -> crate::Result<()> {
        let mut state = self.inner.lock();
        *state.downloads.entry(resource_id.to_string()).or_default() += 1;
        Ok(())
    }

    async fn balance(&self, payee: &str) -> crate::Result<u64> {
        Ok(self.inner.lock().balances.get(payee).copied().unwrap_or(0))
    }

    async fn download_count(&self, resource_id: &str) -> crate::Result<u64> {
        Ok(self
            .inner
            .lock()
            .downloads
            .get(resource_id)
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_examples() {
        let split = split_fee(101, 25);
        assert_eq!(split.platform_cents, 25);
        assert_eq!(split.payee_cents, 76);

        let split = split_fee(500, 25);
        assert_eq!(split.platform_cents, 125);
        assert_eq!(split.payee_cents, 375);

        let split = split_fee(0, 25);
        assert_eq!(split.platform_cents, 0);
        assert_eq!(split.payee_cents, 0);

        let split = split_fee(99, 100);
        assert_eq!(split.platform_cents, 99);
        assert_eq!(split.payee_cents, 0);

        let split = split_fee(99, 0);
        assert_eq!(split.platform_cents, 0);
        assert_eq!(split.payee_cents, 99);
    }

    proptest! {
        #[test]
        fn prop_split_conserves_total(amount in 0u64..=u64::MAX / 2, fee in 0u8..=100) {
            let split = split_fee(amount, fee);
            prop_assert_eq!(split.platform_cents + split.payee_cents, amount);
        }

        #[test]
        fn prop_remainder_goes_to_platform(amount in 0u64..1_000_000, fee in 0u8..=100) {
            // Floor division on the platform side; the payee never receives
            // more than its exact proportional share.
            let split = split_fee(amount, fee);
            prop_assert_eq!(
                u128::from(split.platform_cents),
                u128::from(amount) * u128::from(fee) / 100
            );
            prop_assert!(
                u128::from(split.payee_cents) * 100 >= u128::from(amount) * u128::from(100 - fee)
            );
        }
    }

    fn settlement(reference: &str) -> Settlement {
        Settlement::new(
            "skill-1",
            Some("user-1"),
            Some("vendor-1".to_string()),
            500,
            25,
            Chain::Evm,
            reference,
        )
    }

    #[test]
    fn test_settlement_construction() {
        let s = settlement("0xabc");
        assert_eq!(s.amount_cents, 500);
        assert_eq!(s.platform_cents, 125);
        assert_eq!(s.payee_cents, 375);
        assert_eq!(s.payer, "user-1");
        assert_eq!(s.status, SettlementStatus::Completed);
        assert!(s.id.starts_with("stl-"));
    }

    #[test]
    fn test_anonymous_payer_default() {
        let s = Settlement::new("skill-1", None, None, 100, 25, Chain::Evm, "0xdef");
        assert_eq!(s.payer, ANONYMOUS_PAYER);
        assert!(s.payee.is_none());
    }

    #[tokio::test]
    async fn test_record_credits_payee_and_counts_download() {
        let ledger = MemoryLedger::new();
        ledger.record(settlement("0xabc")).await.expect("record");

        assert_eq!(ledger.settlement_count(), 1);
        assert_eq!(ledger.balance("vendor-1").await.expect("balance"), 375);
        assert_eq!(ledger.download_count("skill-1").await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let ledger = MemoryLedger::new();
        ledger.record(settlement("0xabc")).await.expect("record");

        let err = ledger
            .record(settlement("0xabc"))
            .await
            .expect_err("duplicate must be rejected");
        assert!(matches!(err, crate::Error::DuplicateSettlement(_)));

        // Nothing double-counted.
        assert_eq!(ledger.settlement_count(), 1);
        assert_eq!(ledger.balance("vendor-1").await.expect("balance"), 375);
        assert_eq!(ledger.download_count("skill-1").await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_record_without_payee_keeps_balances_untouched() {
        let ledger = MemoryLedger::new();
        let s = Settlement::new("skill-1", None, None, 500, 25, Chain::Evm, "0xaaa");
        ledger.record(s).await.expect("record");

        assert_eq!(ledger.settlement_count(), 1);
        assert_eq!(ledger.balance("vendor-1").await.expect("balance"), 0);
    }

    #[tokio::test]
    async fn test_free_access_counts_downloads_only() {
        let ledger = MemoryLedger::new();
        ledger.record_access("skill-1").await.expect("access");
        ledger.record_access("skill-1").await.expect("access");

        assert_eq!(ledger.download_count("skill-1").await.expect("count"), 2);
        assert_eq!(ledger.settlement_count(), 0);
    }

    #[tokio::test]
    async fn test_balances_accumulate_across_settlements() {
        let ledger = MemoryLedger::new();
        ledger.record(settlement("0xaaa")).await.expect("record");
        ledger.record(settlement("0xbbb")).await.expect("record");

        assert_eq!(ledger.balance("vendor-1").await.expect("balance"), 750);
        assert_eq!(ledger.download_count("skill-1").await.expect("count"), 2);
    }
}
