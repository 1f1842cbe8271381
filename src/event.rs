//! Gate event system.

use tokio::sync::broadcast;

/// Events emitted by the access gate.
#[derive(Debug, Clone)]
pub enum GateEvent {
    /// A 402 requirement descriptor was emitted.
    RequirementEmitted {
        /// Gated resource identifier.
        resource: String,
        /// Amount owed in cents.
        amount_cents: u64,
    },

    /// A proof was verified by the facilitator.
    PaymentVerified {
        /// Gated resource identifier.
        resource: String,
        /// Settlement reference.
        reference: String,
    },

    /// A settlement was recorded.
    SettlementRecorded {
        /// Gated resource identifier.
        resource: String,
        /// Settlement reference.
        reference: String,
        /// Payee share in cents.
        payee_cents: u64,
    },

    /// Content was released.
    AccessGranted {
        /// Gated resource identifier.
        resource: String,
        /// Whether a settlement accompanied the grant.
        paid: bool,
    },

    /// A replayed settlement reference was rejected.
    ReplayRejected {
        /// Settlement reference.
        reference: String,
    },

    /// Error occurred.
    Error {
        /// Error message.
        message: String,
    },
}

/// Channel for receiving gate events.
pub type GateEventsChannel = broadcast::Receiver<GateEvent>;

/// Sender for gate events.
pub type GateEventsSender = broadcast::Sender<GateEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (GateEventsSender, GateEventsChannel) {
    broadcast::channel(256)
}
