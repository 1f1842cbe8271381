//! Facilitator-backed proof verification.
//!
//! Posts the proof and the requirement it should settle to
//! `<facilitator_url>/verify` and relays the facilitator's verdict. Any
//! transport failure, non-success status, or timeout yields an unverified
//! result so the gate re-emits the 402 (fail-closed).

use crate::chains::Chain;
use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::proof::ProofOfPayment;
use crate::requirement::PaymentRequirement;
use crate::verify::verifier::{ProofVerifier, VerificationResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the facilitator verifier.
#[derive(Debug, Clone)]
pub struct FacilitatorConfig {
    /// Facilitator base URL.
    pub base_url: String,
    /// Timeout for the verification round-trip. Expiry counts as
    /// unverified.
    pub timeout: Duration,
    /// Require the facilitator round-trip. When false, any non-empty proof
    /// is accepted without contacting the facilitator (development only -
    /// insecure). Note that non-strict acceptances mint a fresh synthetic
    /// reference on every call, so the replay guard and the ledger's unique
    /// reference constraint never deduplicate a resubmitted proof in that
    /// mode.
    pub strict: bool,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_FACILITATOR_URL.to_string(),
            timeout: Duration::from_secs(30),
            strict: false,
        }
    }
}

impl From<&GateConfig> for FacilitatorConfig {
    fn from(config: &GateConfig) -> Self {
        Self {
            base_url: config.facilitator_url.clone(),
            timeout: config.verify_timeout(),
            strict: config.strict_verify,
        }
    }
}

/// Request body sent to the facilitator's `/verify` endpoint.
#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "paymentHeader")]
    payment_header: &'a str,
    requirement: &'a PaymentRequirement,
}

/// Verdict returned by the facilitator.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    verified: bool,
    #[serde(default)]
    chain: Option<Chain>,
    #[serde(rename = "txHash", default)]
    tx_hash: Option<String>,
}

/// Proof verifier that delegates to an external facilitator service.
pub struct FacilitatorVerifier {
    config: FacilitatorConfig,
    client: reqwest::Client,
}

impl FacilitatorVerifier {
    /// Create a new facilitator verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: FacilitatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Verification(format!("failed to build HTTP client: {e}")))?;

        if !config.strict {
            warn!(
                "strict verification disabled - any non-empty proof will be accepted (INSECURE, \
                 development only)"
            );
        }

        Ok(Self { config, client })
    }

    /// Whether this verifier performs a real facilitator round-trip.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.config.strict
    }

    /// The configured facilitator base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn verify_with_facilitator(
        &self,
        proof: &ProofOfPayment,
        requirement: &PaymentRequirement,
    ) -> VerificationResult {
        let url = format!("{}/verify", self.config.base_url.trim_end_matches('/'));
        let body = VerifyRequest {
            payment_header: proof.as_str(),
            requirement,
        };

        let request = self.client.post(&url).json(&body).send();
        let response = match tokio::time::timeout(self.config.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("facilitator request to {url} failed: {e}");
                return VerificationResult::unverified();
            }
            Err(_) => {
                warn!("facilitator request to {url} timed out");
                return VerificationResult::unverified();
            }
        };

        if !response.status().is_success() {
            warn!(
                "facilitator at {url} answered status {}",
                response.status()
            );
            return VerificationResult::unverified();
        }

        match response.json::<VerifyResponse>().await {
            Ok(verdict) => result_from_verdict(verdict, proof),
            Err(e) => {
                warn!("unparseable facilitator response: {e}");
                VerificationResult::unverified()
            }
        }
    }
}

/// Map a facilitator verdict onto a verification result. A positive verdict
/// without a transaction hash still settles, under a synthetic reference.
fn result_from_verdict(verdict: VerifyResponse, proof: &ProofOfPayment) -> VerificationResult {
    if !verdict.verified {
        debug!("facilitator rejected proof");
        return VerificationResult::unverified();
    }
    let chain = verdict.chain.unwrap_or(Chain::Evm);
    let reference = verdict
        .tx_hash
        .unwrap_or_else(|| synthetic_reference(proof));
    debug!("facilitator verified proof on {chain}, reference {reference}");
    VerificationResult::settled(chain, reference)
}

#[async_trait::async_trait]
impl ProofVerifier for FacilitatorVerifier {
    async fn verify(
        &self,
        proof: &ProofOfPayment,
        requirement: &PaymentRequirement,
    ) -> Result<VerificationResult> {
        if self.config.strict {
            return Ok(self.verify_with_facilitator(proof, requirement).await);
        }

        // Development mode: accept without a facilitator round-trip.
        warn!(
            "accepting proof without facilitator verification (strict_verify = false, INSECURE)"
        );
        Ok(VerificationResult::settled(
            Chain::Evm,
            synthetic_reference(proof),
        ))
    }
}

/// Synthetic settlement reference for development-mode acceptances and
/// facilitator verdicts that omit a transaction hash.
fn synthetic_reference(proof: &ProofOfPayment) -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(proof.as_str().as_bytes());
    hasher.update(nanos.to_be_bytes());
    let digest = hasher.finalize();
    format!("dev-{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::requirement::{RequirementBuilder, RequirementOptions};

    fn requirement() -> PaymentRequirement {
        let config = GateConfig {
            platform_wallet_evm: Some("0xplatform".to_string()),
            ..GateConfig::default()
        };
        RequirementBuilder::new(&config)
            .build(500, "Download", &RequirementOptions::default())
            .expect("build requirement")
            .body
    }

    fn proof(token: &str) -> ProofOfPayment {
        ProofOfPayment::new(token).expect("non-empty proof")
    }

    #[tokio::test]
    async fn test_dev_mode_accepts_non_empty_proof() {
        let verifier =
            FacilitatorVerifier::new(FacilitatorConfig::default()).expect("create verifier");
        assert!(!verifier.is_strict());

        let result = verifier
            .verify(&proof("anyproof"), &requirement())
            .await
            .expect("verify");
        assert!(result.verified);
        assert_eq!(result.chain, Some(Chain::Evm));
        assert!(result
            .settlement_reference
            .expect("reference")
            .starts_with("dev-"));
    }

    #[tokio::test]
    async fn test_strict_mode_fails_closed_on_unreachable_facilitator() {
        let config = FacilitatorConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(500),
            strict: true,
        };
        let verifier = FacilitatorVerifier::new(config).expect("create verifier");

        let result = verifier
            .verify(&proof("anyproof"), &requirement())
            .await
            .expect("fail-closed, not an error");
        assert!(!result.verified);
    }

    #[tokio::test]
    async fn test_strict_mode_relays_facilitator_verdict() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            // The request body is JSON, so it ends with a closing brace.
            let mut received = Vec::new();
            let mut buf = [0_u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                received.extend_from_slice(&buf[..n]);
                if n == 0 || received.ends_with(b"}") {
                    break;
                }
            }
            let body = r#"{"verified":true,"chain":"solana","txHash":"0xdeadbeef"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            received
        });

        let config = FacilitatorConfig {
            base_url: format!("http://{addr}"),
            timeout: Duration::from_secs(5),
            strict: true,
        };
        let verifier = FacilitatorVerifier::new(config).expect("create verifier");
        let result = verifier
            .verify(&proof("realproof"), &requirement())
            .await
            .expect("verify");

        assert!(result.verified);
        assert_eq!(result.chain, Some(Chain::Solana));
        assert_eq!(result.settlement_reference.as_deref(), Some("0xdeadbeef"));

        // The round-trip posted the proof under the expected field name.
        let received = server.await.expect("server task");
        let received = String::from_utf8_lossy(&received);
        assert!(received.contains("POST /verify"));
        assert!(received.contains("\"paymentHeader\":\"realproof\""));
    }

    #[test]
    fn test_verdict_with_tx_hash_settles_on_reported_chain() {
        let verdict = VerifyResponse {
            verified: true,
            chain: Some(Chain::Solana),
            tx_hash: Some("0xabc".to_string()),
        };
        let result = result_from_verdict(verdict, &proof("tok"));
        assert!(result.verified);
        assert_eq!(result.chain, Some(Chain::Solana));
        assert_eq!(result.settlement_reference.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_verdict_without_tx_hash_gets_synthetic_reference() {
        let verdict = VerifyResponse {
            verified: true,
            chain: None,
            tx_hash: None,
        };
        let result = result_from_verdict(verdict, &proof("tok"));
        assert!(result.verified);
        assert_eq!(result.chain, Some(Chain::Evm));
        assert!(result
            .settlement_reference
            .expect("reference")
            .starts_with("dev-"));
    }

    #[test]
    fn test_negative_verdict_is_unverified() {
        let verdict = VerifyResponse {
            verified: false,
            chain: Some(Chain::Evm),
            tx_hash: Some("0xabc".to_string()),
        };
        let result = result_from_verdict(verdict, &proof("tok"));
        assert!(!result.verified);
        assert!(result.settlement_reference.is_none());
    }

    #[test]
    fn test_synthetic_references_differ_per_proof() {
        let a = synthetic_reference(&proof("aaa"));
        let b = synthetic_reference(&proof("bbb"));
        assert_ne!(a, b);
        assert!(a.starts_with("dev-"));
    }

    #[test]
    fn test_synthetic_references_differ_even_for_the_same_proof() {
        // A resubmitted proof mints a fresh reference in non-strict mode,
        // so replay protection cannot key off it there.
        let p = proof("same");
        let a = synthetic_reference(&p);
        std::thread::sleep(Duration::from_millis(2));
        let b = synthetic_reference(&p);
        assert_ne!(a, b);
    }
}
