//! Priceable resources and the external content store boundary.

use crate::chains::Chain;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A resource that can be gated behind payment.
///
/// A resource is free iff `price_cents` is zero; there is no separate
/// stored flag to keep in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceableResource {
    /// Opaque resource identifier.
    pub id: String,

    /// Price in cents. Zero means free.
    #[serde(default)]
    pub price_cents: u64,

    /// Identifier of the party who receives settled funds. When `None`,
    /// proceeds stay with the platform.
    #[serde(default)]
    pub owner: Option<String>,

    /// Owner's payout wallet on EVM chains, if configured.
    #[serde(default)]
    pub payout_wallet_evm: Option<String>,

    /// Owner's payout wallet on Solana, if configured.
    #[serde(default)]
    pub payout_wallet_solana: Option<String>,

    /// Preferred chain family for descriptor ordering. Falls back to the
    /// gate-wide preference when unset.
    #[serde(default)]
    pub preferred_chain: Option<Chain>,

    /// Human-readable description used in payment requirements.
    pub description: String,
}

impl PriceableResource {
    /// Create a free resource.
    #[must_use]
    pub fn free(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::priced(id, description, 0)
    }

    /// Create a priced resource.
    #[must_use]
    pub fn priced(id: impl Into<String>, description: impl Into<String>, price_cents: u64) -> Self {
        Self {
            id: id.into(),
            price_cents,
            owner: None,
            payout_wallet_evm: None,
            payout_wallet_solana: None,
            preferred_chain: None,
            description: description.into(),
        }
    }

    /// Whether this resource is released without payment.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }

    /// Owner payout wallet for the given chain family.
    #[must_use]
    pub fn payout_wallet(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::Evm => self.payout_wallet_evm.as_deref(),
            Chain::Solana => self.payout_wallet_solana.as_deref(),
        }
    }
}

/// External content store the gate releases bytes from.
///
/// The gate only reads; download accounting lives in the ledger.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the content bytes for a resource id. `Ok(None)` means the
    /// resource has no downloadable content.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    async fn fetch(&self, resource_id: &str) -> crate::Result<Option<Bytes>>;
}

/// In-memory content store for tests and the demo binary.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    inner: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryContent {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert content bytes for a resource id.
    pub fn insert(&self, resource_id: impl Into<String>, content: impl Into<Bytes>) {
        self.inner.lock().insert(resource_id.into(), content.into());
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryContent {
    async fn fetch(&self, resource_id: &str) -> crate::Result<Option<Bytes>> {
        Ok(self.inner.lock().get(resource_id).cloned())
    }
}
