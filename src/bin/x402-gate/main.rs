//! x402-gate CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use x402_gate::{
    FacilitatorConfig, FacilitatorVerifier, ProofOfPayment, ProofVerifier, RequirementBuilder,
    RequirementOptions,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments and resolve configuration
    let cli = Cli::parse();
    let config = cli.to_config()?;

    // Initialize tracing from the resolved config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("x402-gate v{}", env!("CARGO_PKG_VERSION"));
    let builder = RequirementBuilder::new(&config);
    let required = builder.build(
        cli.amount_cents,
        &cli.description,
        &RequirementOptions::default(),
    )?;

    match cli.proof {
        Some(ref token) => {
            let Some(proof) = ProofOfPayment::new(token.clone()) else {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "verified": false,
                    "error": "empty proof token",
                }))?);
                return Ok(());
            };

            let verifier = FacilitatorVerifier::new(FacilitatorConfig::from(&config))?;
            info!(
                "verifying proof against {} (strict={})",
                verifier.base_url(),
                verifier.is_strict()
            );
            let result = verifier.verify(&proof, &required.body).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        None => {
            info!(
                "402 descriptor for {} ({} accepted methods)",
                cli.description,
                required.body.accepts.len()
            );
            println!("{}", serde_json::to_string_pretty(&required.body)?);
        }
    }

    Ok(())
}
