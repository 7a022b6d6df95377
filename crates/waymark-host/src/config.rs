//! Environment configuration.

use std::path::PathBuf;

use waymark_core::progress::Namespace;

use crate::error::HostError;

/// Path to the scene catalog. Required.
pub const CATALOG_VAR: &str = "WAYMARK_CATALOG";
/// Directory for progress records.
pub const STORE_DIR_VAR: &str = "WAYMARK_STORE_DIR";
/// Signed-in user id. Unset or blank means anonymous.
pub const NAMESPACE_VAR: &str = "WAYMARK_NAMESPACE";

const DEFAULT_STORE_DIR: &str = "./waymark-data";

/// Host settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// YAML or JSON scene catalog.
    pub catalog: PathBuf,
    /// Progress record directory.
    pub store_dir: PathBuf,
    /// Progress namespace.
    pub namespace: Namespace,
}

impl HostConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Config` if `WAYMARK_CATALOG` is unset or blank.
    pub fn from_env() -> Result<Self, HostError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Config` if the catalog path is missing or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HostError> {
        let catalog = lookup(CATALOG_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| HostError::Config(format!("{CATALOG_VAR} environment variable must be set")))?;
        let store_dir = lookup(STORE_DIR_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_DIR.to_owned());
        let namespace = Namespace::for_user(lookup(NAMESPACE_VAR).as_deref());

        Ok(Self {
            catalog: PathBuf::from(catalog),
            store_dir: PathBuf::from(store_dir),
            namespace,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = HostConfig::from_lookup(lookup(&[(CATALOG_VAR, "scenes.yaml")])).unwrap();

        assert_eq!(config.catalog, PathBuf::from("scenes.yaml"));
        assert_eq!(config.store_dir, PathBuf::from("./waymark-data"));
        assert!(config.namespace.is_anonymous());
    }

    #[test]
    fn test_all_variables_are_read() {
        let config = HostConfig::from_lookup(lookup(&[
            (CATALOG_VAR, "/etc/waymark/scenes.json"),
            (STORE_DIR_VAR, "/var/lib/waymark"),
            (NAMESPACE_VAR, "player-9"),
        ]))
        .unwrap();

        assert_eq!(config.store_dir, PathBuf::from("/var/lib/waymark"));
        assert_eq!(config.namespace, Namespace::user("player-9"));
    }

    #[test]
    fn test_missing_catalog_is_config_error() {
        let result = HostConfig::from_lookup(lookup(&[(CATALOG_VAR, "  ")]));

        assert!(matches!(result, Err(HostError::Config(message)) if message.contains(CATALOG_VAR)));
    }
}
