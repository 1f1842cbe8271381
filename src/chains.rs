//! Chain and network registry for accepted payment methods.
//!
//! All settlement happens in USDC. Networks are identified by CAIP-2 strings
//! (`eip155:<chain-id>` for EVM chains, `solana:<genesis-prefix>` for
//! Solana). Adding a chain is a data change to [`NETWORKS`], not a code
//! change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain family an accepted payment method settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// EVM-compatible chains (Base by default).
    #[default]
    Evm,
    /// Solana.
    Solana,
}

impl Chain {
    /// All chain families, in descriptor-emission order.
    pub const ALL: [Self; 2] = [Self::Evm, Self::Solana];

    /// CAIP-2 namespace prefix for this chain family.
    #[must_use]
    pub fn caip2_prefix(self) -> &'static str {
        match self {
            Self::Evm => "eip155:",
            Self::Solana => "solana:",
        }
    }

    /// Whether the given CAIP-2 network id belongs to this chain family.
    #[must_use]
    pub fn matches(self, caip2: &str) -> bool {
        caip2.starts_with(self.caip2_prefix())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => write!(f, "evm"),
            Self::Solana => write!(f, "solana"),
        }
    }
}

/// A payment network an accepted method can settle on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    /// CAIP-2 network identifier.
    pub caip2: &'static str,
    /// Human-readable network name.
    pub name: &'static str,
    /// Chain family.
    pub chain: Chain,
    /// Whether this is a test network.
    pub testnet: bool,
    /// USDC contract/mint address on this network, if deployed.
    pub usdc: Option<&'static str>,
}

/// Base mainnet - the default EVM settlement network (low fees).
pub const BASE: Network = Network {
    caip2: "eip155:8453",
    name: "Base",
    chain: Chain::Evm,
    testnet: false,
    usdc: Some("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
};

/// Base Sepolia test network. Also the fallback network for degraded
/// descriptors.
pub const BASE_SEPOLIA: Network = Network {
    caip2: "eip155:84532",
    name: "Base Sepolia",
    chain: Chain::Evm,
    testnet: true,
    usdc: Some("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
};

/// Ethereum mainnet.
pub const ETHEREUM: Network = Network {
    caip2: "eip155:1",
    name: "Ethereum",
    chain: Chain::Evm,
    testnet: false,
    usdc: Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
};

/// Polygon mainnet.
pub const POLYGON: Network = Network {
    caip2: "eip155:137",
    name: "Polygon",
    chain: Chain::Evm,
    testnet: false,
    usdc: Some("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
};

/// BNB Chain mainnet.
pub const BNB: Network = Network {
    caip2: "eip155:56",
    name: "BNB Chain",
    chain: Chain::Evm,
    testnet: false,
    usdc: Some("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
};

/// Solana mainnet.
pub const SOLANA_MAINNET: Network = Network {
    caip2: "solana:5eykt4SsFv8VHZbfC",
    name: "Solana",
    chain: Chain::Solana,
    testnet: false,
    usdc: Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
};

/// Solana devnet.
pub const SOLANA_DEVNET: Network = Network {
    caip2: "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    name: "Solana Devnet",
    chain: Chain::Solana,
    testnet: true,
    usdc: Some("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
};

/// All known networks.
pub const NETWORKS: &[Network] = &[
    BASE,
    BASE_SEPOLIA,
    ETHEREUM,
    POLYGON,
    BNB,
    SOLANA_MAINNET,
    SOLANA_DEVNET,
];

/// Zero-value EVM placeholder address used by the fallback descriptor entry.
pub const ZERO_EVM_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Default mainnet settlement network for a chain family.
#[must_use]
pub fn mainnet_for(chain: Chain) -> Network {
    match chain {
        Chain::Evm => BASE,
        Chain::Solana => SOLANA_MAINNET,
    }
}

/// Default test network for a chain family.
#[must_use]
pub fn testnet_for(chain: Chain) -> Network {
    match chain {
        Chain::Evm => BASE_SEPOLIA,
        Chain::Solana => SOLANA_DEVNET,
    }
}

/// Fallback network used when no payout wallet resolves on any chain.
#[must_use]
pub fn fallback_network() -> Network {
    BASE_SEPOLIA
}

/// Look up the USDC contract address for a CAIP-2 network id.
#[must_use]
pub fn usdc_contract(caip2: &str) -> Option<&'static str> {
    NETWORKS.iter().find(|n| n.caip2 == caip2).and_then(|n| n.usdc)
}
