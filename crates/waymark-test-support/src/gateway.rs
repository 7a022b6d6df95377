//! Test gateways: mock `ProgressGateway` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use waymark_core::error::DomainError;
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::{Namespace, RuntimeProgress};

/// A gateway that records every `load` and `save` call. Returns the
/// configured record from `load` and always succeeds on `save`.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    stored: Mutex<Option<RuntimeProgress>>,
    loads: Mutex<Vec<Namespace>>,
    saves: Mutex<Vec<(Namespace, RuntimeProgress)>>,
}

impl RecordingGateway {
    /// Create a recording gateway whose `load` returns `stored`.
    #[must_use]
    pub fn new(stored: Option<RuntimeProgress>) -> Self {
        Self {
            stored: Mutex::new(stored),
            ..Self::default()
        }
    }

    /// Returns the namespaces passed to `load`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn loaded_namespaces(&self) -> Vec<Namespace> {
        self.loads.lock().unwrap().clone()
    }

    /// Returns a snapshot of every saved record, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<(Namespace, RuntimeProgress)> {
        self.saves.lock().unwrap().clone()
    }

    /// Returns the most recently saved record.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn last_saved(&self) -> Option<RuntimeProgress> {
        self.saves.lock().unwrap().last().map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl ProgressGateway for RecordingGateway {
    async fn load(&self, namespace: &Namespace) -> Result<Option<RuntimeProgress>, DomainError> {
        self.loads.lock().unwrap().push(namespace.clone());
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn save(
        &self,
        namespace: &Namespace,
        progress: &RuntimeProgress,
    ) -> Result<(), DomainError> {
        self.saves
            .lock()
            .unwrap()
            .push((namespace.clone(), progress.clone()));
        *self.stored.lock().unwrap() = Some(progress.clone());
        Ok(())
    }
}

/// A gateway that never has anything stored and silently accepts saves.
#[derive(Debug)]
pub struct EmptyGateway;

#[async_trait]
impl ProgressGateway for EmptyGateway {
    async fn load(&self, _namespace: &Namespace) -> Result<Option<RuntimeProgress>, DomainError> {
        Ok(None)
    }

    async fn save(
        &self,
        _namespace: &Namespace,
        _progress: &RuntimeProgress,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A gateway that always returns a persistence error. Counts save attempts
/// so tests can observe retries.
#[derive(Debug, Default)]
pub struct FailingGateway {
    save_attempts: Mutex<usize>,
}

impl FailingGateway {
    /// Returns how many times `save` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_attempts(&self) -> usize {
        *self.save_attempts.lock().unwrap()
    }
}

#[async_trait]
impl ProgressGateway for FailingGateway {
    async fn load(&self, _namespace: &Namespace) -> Result<Option<RuntimeProgress>, DomainError> {
        Err(DomainError::Persistence("storage unavailable".into()))
    }

    async fn save(
        &self,
        _namespace: &Namespace,
        _progress: &RuntimeProgress,
    ) -> Result<(), DomainError> {
        *self.save_attempts.lock().unwrap() += 1;
        Err(DomainError::Persistence("storage unavailable".into()))
    }
}
