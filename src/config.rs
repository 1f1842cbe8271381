//! Configuration for the payment gate.
//!
//! All environment-derived settings are resolved once, here, into an
//! explicit [`GateConfig`] that is passed by reference into the requirement
//! builder, verifier, and ledger at construction time.

use crate::chains::Chain;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default facilitator base URL.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// Payment gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Platform fee percentage applied to every settlement (0-100).
    #[serde(default = "default_fee_percent")]
    pub fee_percent: u8,

    /// Platform payout wallet on EVM chains. Receives settlements when a
    /// resource has no payout wallet of its own.
    #[serde(default)]
    pub platform_wallet_evm: Option<String>,

    /// Platform payout wallet on Solana.
    #[serde(default)]
    pub platform_wallet_solana: Option<String>,

    /// Facilitator base URL for proof verification.
    #[serde(default = "default_facilitator_url")]
    pub facilitator_url: String,

    /// Require a facilitator round-trip for every proof. When false, any
    /// non-empty proof is accepted (development only - insecure), and each
    /// acceptance mints a fresh synthetic settlement reference, so replay
    /// protection does not deduplicate resubmitted proofs in that mode.
    #[serde(default)]
    pub strict_verify: bool,

    /// Include test networks (Base Sepolia, Solana Devnet) in descriptors.
    #[serde(default)]
    pub testnet: bool,

    /// Preferred chain family for descriptor ordering.
    #[serde(default)]
    pub preferred_chain: Chain,

    /// Timeout for facilitator verification calls, in seconds.
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,

    /// Capacity of the replay guard (settled references kept in memory).
    #[serde(default = "default_replay_capacity")]
    pub replay_capacity: usize,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fee_percent: default_fee_percent(),
            platform_wallet_evm: None,
            platform_wallet_solana: None,
            facilitator_url: default_facilitator_url(),
            strict_verify: false,
            testnet: false,
            preferred_chain: Chain::default(),
            verify_timeout_secs: default_verify_timeout_secs(),
            replay_capacity: default_replay_capacity(),
            log_level: default_log_level(),
        }
    }
}

const fn default_fee_percent() -> u8 {
    25
}

fn default_facilitator_url() -> String {
    DEFAULT_FACILITATOR_URL.to_string()
}

const fn default_verify_timeout_secs() -> u64 {
    30
}

const fn default_replay_capacity() -> usize {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default configuration file path.
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "x402-gate")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("x402-gate.toml"))
}

impl GateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed configuration fails validation.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build configuration from the process environment, resolved once at
    /// startup. Recognized variables: `X402_FACILITATOR_URL`,
    /// `X402_PAY_TO_EVM`, `X402_PAY_TO_SOLANA`, `PLATFORM_FEE_PERCENT`,
    /// `X402_STRICT_VERIFY`, `X402_TESTNET`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unparseable, or if the
    /// resulting configuration fails validation.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = env_nonempty("X402_FACILITATOR_URL") {
            config.facilitator_url = url;
        }
        config.platform_wallet_evm = env_nonempty("X402_PAY_TO_EVM");
        config.platform_wallet_solana = env_nonempty("X402_PAY_TO_SOLANA");

        if let Some(fee) = env_nonempty("PLATFORM_FEE_PERCENT") {
            config.fee_percent = fee
                .parse()
                .map_err(|_| crate::Error::Config(format!("bad PLATFORM_FEE_PERCENT: {fee}")))?;
        }
        if let Some(strict) = env_nonempty("X402_STRICT_VERIFY") {
            config.strict_verify = strict == "true" || strict == "1";
        }
        if let Some(testnet) = env_nonempty("X402_TESTNET") {
            config.testnet = testnet == "true" || testnet == "1";
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error if `fee_percent` exceeds 100.
    pub fn validate(&self) -> crate::Result<()> {
        if self.fee_percent > 100 {
            return Err(crate::Error::Config(format!(
                "fee_percent must be 0-100, got {}",
                self.fee_percent
            )));
        }
        Ok(())
    }

    /// Verification timeout as a [`Duration`].
    #[must_use]
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    /// Platform payout wallet for the given chain family.
    #[must_use]
    pub fn platform_wallet(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::Evm => self.platform_wallet_evm.as_deref(),
            Chain::Solana => self.platform_wallet_solana.as_deref(),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.fee_percent, 25);
        assert_eq!(config.facilitator_url, DEFAULT_FACILITATOR_URL);
        assert!(!config.strict_verify);
        assert!(!config.testnet);
        assert_eq!(config.preferred_chain, Chain::Evm);
        assert_eq!(config.verify_timeout_secs, 30);
        config.validate().expect("default config is valid");
    }

    #[test]
    fn test_fee_percent_validation() {
        let config = GateConfig {
            fee_percent: 101,
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GateConfig {
            fee_percent: 100,
            ..GateConfig::default()
        };
        config.validate().expect("100 percent is allowed");
    }

    #[test]
    fn test_platform_wallet_per_chain() {
        let config = GateConfig {
            platform_wallet_evm: Some("0xabc".to_string()),
            ..GateConfig::default()
        };
        assert_eq!(config.platform_wallet(Chain::Evm), Some("0xabc"));
        assert_eq!(config.platform_wallet(Chain::Solana), None);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let config = GateConfig {
            fee_percent: 10,
            platform_wallet_solana: Some("So1anaWa11et".to_string()),
            testnet: true,
            ..GateConfig::default()
        };
        config.to_file(&path).expect("save");

        let loaded = GateConfig::from_file(&path).expect("load");
        assert_eq!(loaded.fee_percent, 10);
        assert_eq!(
            loaded.platform_wallet_solana.as_deref(),
            Some("So1anaWa11et")
        );
        assert!(loaded.testnet);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GateConfig =
            toml::from_str("fee_percent = 30\n").expect("parse partial config");
        assert_eq!(config.fee_percent, 30);
        assert_eq!(config.facilitator_url, DEFAULT_FACILITATOR_URL);
        assert_eq!(config.replay_capacity, 100_000);
    }
}
