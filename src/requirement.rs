//! Payment-requirement descriptors and the 402 response builder.
//!
//! A [`PaymentRequirement`] is the machine-readable body of an HTTP 402
//! response: the amount owed and an ordered list of accepted payment
//! methods. Building one never fails for configuration reasons; when no
//! payout wallet resolves on any chain the descriptor degrades to a single
//! zero-address entry on the fallback test network.

use crate::chains::{self, Chain};
use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::resource::PriceableResource;
use serde::{Deserialize, Serialize};

/// One way the payer may settle the requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedMethod {
    /// Payment scheme identifier (`exact` for fixed-price content).
    pub scheme: String,
    /// Display price, e.g. `$5.00`.
    pub price: String,
    /// CAIP-2 network identifier.
    pub network: String,
    /// Recipient address on that network.
    #[serde(rename = "payTo")]
    pub pay_to: String,
}

/// Machine-readable "payment required" descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// Amount owed, in cents.
    #[serde(rename = "amountCents")]
    pub amount_cents: u64,
    /// Human-readable description of what is being paid for.
    pub description: String,
    /// Accepted payment methods, preferred chain family first.
    pub accepts: Vec<AcceptedMethod>,
}

/// A complete 402 response: status, JSON body, and negotiation headers.
#[derive(Debug, Clone)]
pub struct PaymentRequired {
    /// HTTP status code (always 402).
    pub status: u16,
    /// Response body.
    pub body: PaymentRequirement,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl PaymentRequired {
    /// Serialize the body to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn body_json(&self) -> Result<String> {
        serde_json::to_string(&self.body).map_err(|e| Error::InvalidRequirement(e.to_string()))
    }
}

/// Per-call options for [`RequirementBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RequirementOptions {
    /// Explicit EVM payout address, overriding the platform wallet.
    pub pay_to_evm: Option<String>,
    /// Explicit Solana payout address, overriding the platform wallet.
    pub pay_to_solana: Option<String>,
    /// Preferred chain family for ordering. Defaults to the gate-wide
    /// preference.
    pub preferred_chain: Option<Chain>,
    /// Include test-network entries. Defaults to the gate-wide setting.
    pub testnet: Option<bool>,
}

impl RequirementOptions {
    /// Options derived from a resource: its payout wallets take priority
    /// over the platform wallets, and its chain preference applies.
    #[must_use]
    pub fn for_resource(resource: &PriceableResource) -> Self {
        Self {
            pay_to_evm: resource.payout_wallet_evm.clone(),
            pay_to_solana: resource.payout_wallet_solana.clone(),
            preferred_chain: resource.preferred_chain,
            testnet: None,
        }
    }
}

/// Builds [`PaymentRequired`] responses from an amount, a description, and
/// resolved payout wallets.
#[derive(Debug, Clone, Copy)]
pub struct RequirementBuilder<'a> {
    config: &'a GateConfig,
}

impl<'a> RequirementBuilder<'a> {
    /// Create a builder over the given configuration.
    #[must_use]
    pub fn new(config: &'a GateConfig) -> Self {
        Self { config }
    }

    /// Build a 402 response for the given amount and description.
    ///
    /// Per chain family, the payout address resolves in priority order:
    /// explicit option, then platform wallet. Each resolvable chain
    /// contributes a mainnet entry plus, in testnet mode, a test-network
    /// entry. When nothing resolves, a single zero-address fallback entry is
    /// emitted so the descriptor is always structurally valid. Entries for
    /// the preferred chain family sort first; the sort is stable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequirement`] for a zero amount or an empty
    /// description. Absent wallet configuration is not an error.
    pub fn build(
        &self,
        amount_cents: u64,
        description: &str,
        options: &RequirementOptions,
    ) -> Result<PaymentRequired> {
        if amount_cents == 0 {
            return Err(Error::InvalidRequirement(
                "amount must be positive".to_string(),
            ));
        }
        if description.trim().is_empty() {
            return Err(Error::InvalidRequirement(
                "description must not be empty".to_string(),
            ));
        }

        let price = display_price(amount_cents);
        let testnet = options.testnet.unwrap_or(self.config.testnet);
        let preferred = options
            .preferred_chain
            .unwrap_or(self.config.preferred_chain);

        let mut accepts = Vec::new();
        for chain in Chain::ALL {
            let Some(pay_to) = self.resolve_wallet(chain, options) else {
                continue;
            };
            accepts.push(AcceptedMethod {
                scheme: "exact".to_string(),
                price: price.clone(),
                network: chains::mainnet_for(chain).caip2.to_string(),
                pay_to: pay_to.to_string(),
            });
            if testnet {
                accepts.push(AcceptedMethod {
                    scheme: "exact".to_string(),
                    price: price.clone(),
                    network: chains::testnet_for(chain).caip2.to_string(),
                    pay_to: pay_to.to_string(),
                });
            }
        }

        if accepts.is_empty() {
            // Degraded mode: no payout wallet on any chain. Keep the shape
            // valid with a zero-address entry on the fallback test network.
            accepts.push(AcceptedMethod {
                scheme: "exact".to_string(),
                price,
                network: chains::fallback_network().caip2.to_string(),
                pay_to: chains::ZERO_EVM_ADDRESS.to_string(),
            });
        }

        // Stable: does not reorder entries within a chain family.
        accepts.sort_by_key(|m| usize::from(!preferred.matches(&m.network)));

        Ok(PaymentRequired {
            status: 402,
            body: PaymentRequirement {
                amount_cents,
                description: description.to_string(),
                accepts,
            },
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Payment-Required".to_string(), "true".to_string()),
                (
                    "X-Payment-Facilitator".to_string(),
                    self.config.facilitator_url.clone(),
                ),
            ],
        })
    }

    /// Build a 402 response for a priced resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequirement`] if the resource is free or has
    /// an empty description.
    pub fn build_for_resource(&self, resource: &PriceableResource) -> Result<PaymentRequired> {
        self.build(
            resource.price_cents,
            &resource.description,
            &RequirementOptions::for_resource(resource),
        )
    }

    fn resolve_wallet<'b>(&'b self, chain: Chain, options: &'b RequirementOptions) -> Option<&'b str> {
        let explicit = match chain {
            Chain::Evm => options.pay_to_evm.as_deref(),
            Chain::Solana => options.pay_to_solana.as_deref(),
        };
        explicit
            .or_else(|| self.config.platform_wallet(chain))
            .filter(|w| !w.trim().is_empty())
    }
}

/// Format cents as a `$X.YY` display string using integer math.
#[must_use]
pub fn display_price(amount_cents: u64) -> String {
    format!("${}.{:02}", amount_cents / 100, amount_cents % 100)
}
