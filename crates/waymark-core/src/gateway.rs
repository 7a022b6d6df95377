//! Progress persistence abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::progress::{Namespace, RuntimeProgress};

/// Key-value gateway that loads and saves [`RuntimeProgress`] per namespace.
///
/// The engine treats every failure as soft: a failed load starts from empty
/// progress, a failed save leaves the in-memory copy authoritative.
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    /// Loads the record for `namespace`. Returns `Ok(None)` when nothing has
    /// been stored yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on I/O failure or when the stored
    /// record cannot be decoded.
    async fn load(&self, namespace: &Namespace) -> Result<Option<RuntimeProgress>, DomainError>;

    /// Replaces the record for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` on I/O failure.
    async fn save(&self, namespace: &Namespace, progress: &RuntimeProgress)
    -> Result<(), DomainError>;
}
