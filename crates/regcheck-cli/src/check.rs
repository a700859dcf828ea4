//! # Check Subcommand
//!
//! Checks phone numbers against a registration bridge. The bridge session is
//! queried first; numbers are only sent once it reports a connected session.

use anyhow::{bail, Context, Result};
use clap::Args;
use regcheck_client::{BridgeConfig, BridgeState, RegistrationBridge};
use regcheck_core::{check_batch, BatchResult, NormalizationPolicy, PhoneNormalizer, RawIdentifier};
use url::Url;

use crate::BatchArgs;

/// Arguments for the `regcheck check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Phone numbers in any formatting.
    #[arg(value_name = "NUMBER", required = true)]
    pub numbers: Vec<String>,

    /// Registration bridge base URL.
    #[arg(long, env = "REGISTRATION_BRIDGE_URL")]
    pub bridge_url: Url,

    /// Region prefix for numbers without one.
    #[arg(long, default_value = "55")]
    pub country_code: String,

    /// Reject numbers outside 8 to 15 digits instead of guessing.
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Check the numbers and return the aggregate result.
pub async fn check_numbers(args: &CheckArgs) -> Result<BatchResult> {
    let bridge = RegistrationBridge::new(&BridgeConfig::new(args.bridge_url.clone()))
        .context("failed to build bridge client")?;

    let report = bridge
        .session()
        .await
        .with_context(|| format!("failed to query bridge session at {}", args.bridge_url))?;
    if report.state != BridgeState::Connected {
        bail!(
            "bridge session is not ready (state: {:?}{})",
            report.state,
            report
                .reason
                .as_deref()
                .map(|r| format!(", reason: {r}"))
                .unwrap_or_default()
        );
    }

    let policy = if args.strict {
        NormalizationPolicy::Strict
    } else {
        NormalizationPolicy::Lenient
    };
    let normalizer = PhoneNormalizer::new(&args.country_code, policy);
    let raw: Vec<RawIdentifier> = args
        .numbers
        .iter()
        .map(|n| RawIdentifier::from(n.as_str()))
        .collect();

    let result = check_batch(&raw, &normalizer, &bridge, &args.batch.batch_config())
        .await
        .context("phone number batch rejected")?;

    tracing::info!(
        total = result.total(),
        errors = result.error_count(),
        "phone numbers checked"
    );
    Ok(result)
}

/// Execute the check subcommand.
pub async fn run_check(args: &CheckArgs) -> Result<u8> {
    let result = check_numbers(args).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(0)
}
