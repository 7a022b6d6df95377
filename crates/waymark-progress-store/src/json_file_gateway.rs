//! One JSON file per namespace under a root directory.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use waymark_core::error::DomainError;
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::{Namespace, RuntimeProgress};

use crate::error::StoreError;

/// File-backed progress gateway.
///
/// Records are written to a temporary sibling and renamed into place, so a
/// crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    root: PathBuf,
}

impl JsonFileGateway {
    /// Creates a gateway storing records under `root`. The directory is
    /// created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The record path for `namespace`.
    #[must_use]
    pub fn record_path(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(namespace)))
    }

    async fn read(&self, namespace: &Namespace) -> Result<Option<RuntimeProgress>, StoreError> {
        let path = self.record_path(namespace);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    async fn write(&self, namespace: &Namespace, progress: &RuntimeProgress) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(progress)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
        let path = self.record_path(namespace);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}

#[async_trait]
impl ProgressGateway for JsonFileGateway {
    async fn load(&self, namespace: &Namespace) -> Result<Option<RuntimeProgress>, DomainError> {
        let record = self.read(namespace).await?;
        debug!(%namespace, found = record.is_some(), "progress record read");
        Ok(record)
    }

    async fn save(&self, namespace: &Namespace, progress: &RuntimeProgress) -> Result<(), DomainError> {
        self.write(namespace, progress).await?;
        debug!(%namespace, "progress record written");
        Ok(())
    }
}

/// Maps a namespace onto a portable file stem. ASCII letters, digits, `-`
/// and `_` pass through; every other byte becomes `%XX`, so distinct
/// namespaces never share a file and none can escape the root.
fn file_stem(namespace: &Namespace) -> String {
    let mut stem = String::with_capacity(namespace.as_str().len());
    for byte in namespace.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "%{byte:02X}");
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_passes_safe_characters() {
        assert_eq!(file_stem(&Namespace::user("player_42-a")), "player_42-a");
        assert_eq!(file_stem(&Namespace::anonymous()), "anonymous");
    }

    #[test]
    fn test_file_stem_escapes_path_characters() {
        assert_eq!(file_stem(&Namespace::user("../etc/passwd")), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(file_stem(&Namespace::user("a b")), "a%20b");
    }

    #[test]
    fn test_record_path_is_inside_root() {
        let gateway = JsonFileGateway::new("/var/lib/waymark");

        let path = gateway.record_path(&Namespace::user("user@example.com"));

        assert_eq!(path, PathBuf::from("/var/lib/waymark/user%40example%2Ecom.json"));
    }
}
