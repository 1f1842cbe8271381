//! Proof-of-payment extraction from request headers.
//!
//! Purely transport-level: the token is pulled out of the primary header
//! (`PAYMENT-SIGNATURE`) or its legacy alias (`X-PAYMENT`) and handed to the
//! verifier untouched. Presence alone does not imply validity.

use std::collections::HashMap;

/// Primary proof header name.
pub const PAYMENT_HEADER: &str = "payment-signature";

/// Legacy alias checked when the primary header is absent.
pub const LEGACY_PAYMENT_HEADER: &str = "x-payment";

/// An opaque, non-empty proof-of-payment token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfPayment(String);

impl ProofOfPayment {
    /// Wrap a token, rejecting empty or whitespace-only values.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Case-insensitive lookup over a request's headers.
///
/// Implemented for plain collections so the extractor stays independent of
/// any particular HTTP framework.
pub trait HeaderLookup {
    /// Get a header value by case-insensitive name.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderLookup for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl HeaderLookup for [(String, String)] {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl HeaderLookup for Vec<(String, String)> {
    fn header(&self, name: &str) -> Option<&str> {
        self.as_slice().header(name)
    }
}

impl<T: HeaderLookup + ?Sized> HeaderLookup for &T {
    fn header(&self, name: &str) -> Option<&str> {
        (**self).header(name)
    }
}

/// Extract a proof-of-payment token from request headers.
///
/// Checks [`PAYMENT_HEADER`] first, then [`LEGACY_PAYMENT_HEADER`]. Returns
/// `None` when neither is present or the value is empty.
pub fn extract_proof(headers: &impl HeaderLookup) -> Option<ProofOfPayment> {
    headers
        .header(PAYMENT_HEADER)
        .or_else(|| headers.header(LEGACY_PAYMENT_HEADER))
        .and_then(ProofOfPayment::new)
}
