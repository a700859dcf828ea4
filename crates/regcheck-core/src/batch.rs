//! # Batch Orchestrator
//!
//! Validates an ordered list of raw identifiers with per-item isolation.
//!
//! ## Algorithm
//!
//! 1. Reject an empty batch, then an oversized one, before any work.
//! 2. Split the input into contiguous chunks of `sub_batch_size`.
//! 3. Within a chunk, normalize and check every item concurrently; wait for
//!    the whole chunk before starting the next. Peak outbound concurrency is
//!    therefore bounded by the chunk size.
//! 4. Any failure of one item, including a panic inside the collaborator,
//!    becomes that item's [`LookupOutcome::ServiceError`].
//! 5. Results are concatenated in input order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::checker::check_one;
use crate::error::BatchError;
use crate::identifier::{Normalizer, RawIdentifier};
use crate::lookup::LookupCollaborator;
use crate::outcome::{BatchResult, ItemResult, LookupOutcome};

/// Default maximum number of identifiers per batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;

/// Default per-item deadline.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(10);

/// Limits applied to one batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Inputs longer than this are rejected with [`BatchError::BatchTooLarge`].
    pub max_batch_size: usize,
    /// Chunk size for bounded concurrency. `None` processes the whole batch
    /// as a single chunk.
    pub sub_batch_size: Option<usize>,
    /// Per-item lookup deadline.
    pub item_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            sub_batch_size: None,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }
}

impl BatchConfig {
    /// Chunk size actually used, never zero.
    pub fn effective_sub_batch_size(&self) -> usize {
        self.sub_batch_size
            .unwrap_or(self.max_batch_size)
            .max(1)
    }
}

/// Normalize and check every identifier in `raw`.
///
/// Fails only with the structural [`BatchError`]s, and only before any
/// normalization or lookup has happened. Otherwise the returned
/// [`BatchResult`] has exactly one item per input, in input order.
pub async fn check_batch<N, C>(
    raw: &[RawIdentifier],
    normalizer: &N,
    collaborator: &C,
    config: &BatchConfig,
) -> Result<BatchResult<C::Record>, BatchError>
where
    N: Normalizer + ?Sized,
    C: LookupCollaborator + ?Sized,
{
    if raw.is_empty() {
        return Err(BatchError::EmptyBatch);
    }
    if raw.len() > config.max_batch_size {
        return Err(BatchError::BatchTooLarge {
            limit: config.max_batch_size,
            actual: raw.len(),
        });
    }

    let chunk_size = config.effective_sub_batch_size();
    let span = tracing::info_span!(
        "batch",
        batch_id = %Uuid::new_v4(),
        size = raw.len(),
        chunk_size,
    );

    let result = async move {
        let mut items = Vec::with_capacity(raw.len());
        for (index, chunk) in raw.chunks(chunk_size).enumerate() {
            tracing::debug!(chunk = index, len = chunk.len(), "processing chunk");
            let checks = chunk
                .iter()
                .map(|item| isolated_check(item, normalizer, collaborator, config.item_timeout));
            items.extend(join_all(checks).await);
        }

        let result = BatchResult::from_items(raw.len(), items);
        tracing::info!(
            processed = result.processed(),
            errors = result.error_count(),
            "batch complete"
        );
        result
    }
    .instrument(span)
    .await;

    Ok(result)
}

async fn isolated_check<N, C>(
    raw: &RawIdentifier,
    normalizer: &N,
    collaborator: &C,
    timeout: Duration,
) -> ItemResult<C::Record>
where
    N: Normalizer + ?Sized,
    C: LookupCollaborator + ?Sized,
{
    let normalized = normalizer.normalize(raw);
    let check = check_one(raw.clone(), normalized.clone(), collaborator, timeout);
    match AssertUnwindSafe(check).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let detail = panic_detail(panic.as_ref());
            tracing::warn!(raw = %raw, detail = %detail, "lookup panicked");
            ItemResult::new(
                raw.clone(),
                normalized,
                LookupOutcome::ServiceError(detail),
                None,
            )
        }
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "lookup panicked".to_string()
    }
}
