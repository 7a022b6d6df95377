//! Process-local progress records.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use waymark_core::error::DomainError;
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::{Namespace, RuntimeProgress};

/// Keeps records in memory for the lifetime of the process. Suited to
/// anonymous play and tests.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    records: Mutex<HashMap<Namespace, RuntimeProgress>>,
}

impl MemoryGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record for `namespace`.
    #[must_use]
    pub fn get(&self, namespace: &Namespace) -> Option<RuntimeProgress> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .cloned()
    }
}

#[async_trait]
impl ProgressGateway for MemoryGateway {
    async fn load(&self, namespace: &Namespace) -> Result<Option<RuntimeProgress>, DomainError> {
        Ok(self.get(namespace))
    }

    async fn save(&self, namespace: &Namespace, progress: &RuntimeProgress) -> Result<(), DomainError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.clone(), progress.clone());
        Ok(())
    }
}
