//! # CEP Subcommand
//!
//! Validates Brazilian postal codes through the batch orchestrator and
//! prints the aggregate result as JSON.

use anyhow::{Context, Result};
use clap::Args;
use regcheck_client::config::DEFAULT_POSTAL_URL;
use regcheck_client::{PostalAddress, PostalConfig, ViaCepClient};
use regcheck_core::{check_batch, BatchResult, PostalNormalizer, RawIdentifier};
use url::Url;

use crate::BatchArgs;

/// Arguments for the `regcheck cep` subcommand.
#[derive(Args, Debug)]
pub struct CepArgs {
    /// Postal codes, with or without hyphen.
    #[arg(value_name = "CODE", required = true)]
    pub codes: Vec<String>,

    /// ViaCEP base URL.
    #[arg(long, default_value = DEFAULT_POSTAL_URL)]
    pub api_url: Url,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Validate the codes and return the aggregate result.
pub async fn validate_codes(args: &CepArgs) -> Result<BatchResult<PostalAddress>> {
    let config = PostalConfig {
        base_url: args.api_url.clone(),
        timeout_ms: args.batch.timeout_ms,
    };
    let client = ViaCepClient::new(&config).context("failed to build postal client")?;

    let raw: Vec<RawIdentifier> = args
        .codes
        .iter()
        .map(|c| RawIdentifier::from(c.as_str()))
        .collect();
    let result = check_batch(&raw, &PostalNormalizer, &client, &args.batch.batch_config())
        .await
        .context("postal code batch rejected")?;

    tracing::info!(
        total = result.total(),
        errors = result.error_count(),
        "postal codes validated"
    );
    Ok(result)
}

/// Execute the cep subcommand.
pub async fn run_cep(args: &CepArgs) -> Result<u8> {
    let result = validate_codes(args).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(0)
}
