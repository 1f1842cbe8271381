//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use x402_gate::config::GateConfig;
use x402_gate::Chain;

/// Diagnostic tool for the x402 payment gate: print 402 requirement
/// descriptors and check proofs against a facilitator.
#[derive(Parser, Debug)]
#[command(name = "x402-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Amount to require, in cents.
    #[arg(long, short, default_value = "500")]
    pub amount_cents: u64,

    /// Description of what is being paid for.
    #[arg(long, short, default_value = "Premium content")]
    pub description: String,

    /// Preferred chain family for descriptor ordering.
    #[arg(long, value_enum, default_value = "evm")]
    pub preferred_chain: CliChain,

    /// Include test-network entries in the descriptor.
    #[arg(long, env = "X402_TESTNET")]
    pub testnet: bool,

    /// EVM payout address.
    #[arg(long, env = "X402_PAY_TO_EVM")]
    pub pay_to_evm: Option<String>,

    /// Solana payout address.
    #[arg(long, env = "X402_PAY_TO_SOLANA")]
    pub pay_to_solana: Option<String>,

    /// Facilitator base URL.
    #[arg(long, env = "X402_FACILITATOR_URL")]
    pub facilitator_url: Option<String>,

    /// Require a facilitator round-trip when verifying.
    #[arg(long, env = "X402_STRICT_VERIFY")]
    pub strict_verify: bool,

    /// Proof token to verify instead of printing a descriptor.
    #[arg(long)]
    pub proof: Option<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Chain family CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliChain {
    /// EVM-compatible chains.
    Evm,
    /// Solana.
    Solana,
}

impl From<CliChain> for Chain {
    fn from(c: CliChain) -> Self {
        match c {
            CliChain::Evm => Self::Evm,
            CliChain::Solana => Self::Solana,
        }
    }
}

impl Cli {
    /// Convert CLI arguments into a `GateConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<GateConfig> {
        // Start with an explicit config file, the default location, or
        // built-in defaults.
        let mut config = if let Some(ref path) = self.config {
            GateConfig::from_file(path)?
        } else {
            let default_path = x402_gate::config::default_config_path();
            if default_path.exists() {
                GateConfig::from_file(&default_path)?
            } else {
                GateConfig::default()
            }
        };

        // Override with CLI arguments
        if let Some(ref url) = self.facilitator_url {
            config.facilitator_url = url.clone();
        }
        if self.pay_to_evm.is_some() {
            config.platform_wallet_evm = self.pay_to_evm.clone();
        }
        if self.pay_to_solana.is_some() {
            config.platform_wallet_solana = self.pay_to_solana.clone();
        }
        config.strict_verify = self.strict_verify;
        config.testnet = self.testnet;
        config.preferred_chain = self.preferred_chain.into();
        config.log_level = self.log_level.clone();

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flows_into_config() {
        let cli = Cli::try_parse_from(["x402-gate", "--log-level", "debug"]).expect("parse");
        let config = cli.to_config().expect("resolve config");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_wallet_flags_override_config() {
        let cli = Cli::try_parse_from(["x402-gate", "--pay-to-evm", "0xcli"]).expect("parse");
        let config = cli.to_config().expect("resolve config");
        assert_eq!(config.platform_wallet_evm.as_deref(), Some("0xcli"));
    }
}
