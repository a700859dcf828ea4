//! Collaborator seam for external lookup services.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LookupError;

/// An external service that answers "is this canonical identifier known?".
///
/// `Ok(Some(record))` means registered or found, `Ok(None)` means the service
/// answered negatively. Errors are folded into per-item outcomes by
/// [`check_one`](crate::check_one) and never abort a batch.
#[async_trait]
pub trait LookupCollaborator: Send + Sync {
    /// Record returned on a match.
    type Record: Send + 'static;

    /// Look up one canonical identifier.
    async fn lookup(&self, canonical: &str) -> Result<Option<Self::Record>, LookupError>;
}

#[async_trait]
impl<C> LookupCollaborator for Arc<C>
where
    C: LookupCollaborator + ?Sized,
{
    type Record = C::Record;

    async fn lookup(&self, canonical: &str) -> Result<Option<Self::Record>, LookupError> {
        (**self).lookup(canonical).await
    }
}
