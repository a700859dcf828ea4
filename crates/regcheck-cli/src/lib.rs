//! # regcheck-cli: Command-Line Checks
//!
//! Provides the `regcheck` command-line interface over the same core the
//! HTTP service uses.
//!
//! ## Subcommands
//!
//! - `regcheck normalize`: Offline phone number normalization.
//! - `regcheck cep`: Validate postal codes against ViaCEP.
//! - `regcheck check`: Check phone numbers against a registration bridge.
//!
//! ```bash
//! regcheck normalize "(11) 98765-4321" +14155550123 --strict
//! regcheck cep 01001-000 00000000
//! regcheck check 11987654321 --bridge-url http://127.0.0.1:8085
//! ```

pub mod cep;
pub mod check;
pub mod normalize;

use std::time::Duration;

/// Batch settings shared by the networked subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct BatchArgs {
    /// Maximum number of identifiers accepted in one run.
    #[arg(long, default_value_t = regcheck_core::batch::DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Number of lookups in flight at once. Defaults to the whole batch.
    #[arg(long)]
    pub sub_batch_size: Option<usize>,

    /// Per-item deadline in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,
}

impl BatchArgs {
    /// Orchestrator configuration for these arguments.
    pub fn batch_config(&self) -> regcheck_core::BatchConfig {
        regcheck_core::BatchConfig {
            max_batch_size: self.max_batch_size,
            sub_batch_size: self.sub_batch_size,
            item_timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}
