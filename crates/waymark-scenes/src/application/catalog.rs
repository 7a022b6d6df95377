//! Scene catalogs: YAML or JSON documents holding a list of scenes.
//!
//! ```yaml
//! scenes:
//!   - id: home-intro
//!     priority: 72
//!     triggers:
//!       - type: enter-screen
//!         screen: home
//!     steps:
//!       - type: say
//!         text: intro.welcome
//!       - type: end
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use waymark_core::error::DomainError;

use crate::domain::scene::SceneDefinition;

/// Catalog document layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneCatalog {
    /// Scenes in registration order.
    #[serde(default)]
    pub scenes: Vec<SceneDefinition>,
}

/// Source format of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl CatalogFormat {
    /// Picks the format from a file extension. Anything other than `.json`
    /// is read as YAML, which also accepts JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// A parsed catalog plus the authoring findings collected while reading it.
#[derive(Debug, Clone, Default)]
pub struct CatalogReport {
    /// Scenes to register, duplicates removed.
    pub scenes: Vec<SceneDefinition>,
    /// Authoring findings, one line each, prefixed with the scene id.
    pub diagnostics: Vec<String>,
}

/// Parses catalog text.
///
/// A scene id seen twice is an authoring error: the first definition is
/// kept and the later one is reported and skipped. Lint findings are
/// reported without rejecting the scene.
///
/// # Errors
///
/// Returns `DomainError::Catalog` if the text is not a valid catalog.
pub fn parse_catalog(text: &str, format: CatalogFormat) -> Result<CatalogReport, DomainError> {
    let catalog: SceneCatalog = match format {
        CatalogFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| DomainError::Catalog(e.to_string()))?
        }
        CatalogFormat::Json => {
            serde_json::from_str(text).map_err(|e| DomainError::Catalog(e.to_string()))?
        }
    };

    let mut report = CatalogReport::default();
    let mut seen = HashSet::new();
    for scene in catalog.scenes {
        if !seen.insert(scene.id.clone()) {
            let error = DomainError::authoring(scene.id.clone(), "duplicate scene id, skipped");
            warn!(%error, "catalog scene skipped");
            report.diagnostics.push(error.to_string());
            continue;
        }
        for finding in scene.lint() {
            warn!(scene_id = %scene.id, %finding, "scene lint");
            report.diagnostics.push(format!("{}: {finding}", scene.id));
        }
        report.scenes.push(scene);
    }
    Ok(report)
}

/// Reads and parses a catalog file; the format follows the extension.
///
/// # Errors
///
/// Returns `DomainError::Catalog` if the file cannot be read or parsed.
pub async fn load_catalog(path: &Path) -> Result<CatalogReport, DomainError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::Catalog(format!("cannot read {}: {e}", path.display())))?;
    let report = parse_catalog(&text, CatalogFormat::from_path(path))?;
    info!(
        path = %path.display(),
        scenes = report.scenes.len(),
        diagnostics = report.diagnostics.len(),
        "scene catalog loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::Step;
    use crate::domain::trigger::Trigger;

    const CATALOG: &str = r"
scenes:
  - id: home-intro
    priority: 72
    triggers:
      - type: enter-screen
        screen: home
    steps:
      - type: say
        speaker: guide
        text: intro.welcome
      - type: end
  - id: pack-tip
    triggers:
      - type: pack-opened
    condition:
      flags:
        seen_shop: true
    steps:
      - type: highlight
        anchorId: shop.pack
        maskInput: true
";

    #[test]
    fn test_parses_yaml_catalog() {
        // Act
        let report = parse_catalog(CATALOG, CatalogFormat::Yaml).unwrap();

        // Assert
        assert_eq!(report.scenes.len(), 2);
        assert!(report.diagnostics.is_empty());
        let home = &report.scenes[0];
        assert_eq!(home.priority, 72);
        assert_eq!(
            home.triggers,
            vec![Trigger::EnterScreen {
                screen: "home".to_owned()
            }]
        );
        assert_eq!(home.steps.last(), Some(&Step::End));
        assert_eq!(
            report.scenes[1].triggers,
            vec![Trigger::PackOpened { pack_type: None }]
        );
    }

    #[test]
    fn test_duplicate_scene_id_keeps_first() {
        let json = r#"{"scenes":[
            {"id":"a","priority":1,"triggers":[{"type":"first-launch"}],"steps":[]},
            {"id":"a","priority":9,"triggers":[{"type":"first-launch"}],"steps":[]}
        ]}"#;

        let report = parse_catalog(json, CatalogFormat::Json).unwrap();

        assert_eq!(report.scenes.len(), 1);
        assert_eq!(report.scenes[0].priority, 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].contains("duplicate scene id"));
    }

    #[test]
    fn test_lint_findings_are_reported_not_rejected() {
        let yaml = "scenes:\n  - id: orphan\n    steps:\n      - type: goto\n        label: nowhere\n";

        let report = parse_catalog(yaml, CatalogFormat::Yaml).unwrap();

        assert_eq!(report.scenes.len(), 1);
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics.iter().all(|line| line.starts_with("orphan: ")));
    }

    #[test]
    fn test_malformed_catalog_is_a_catalog_error() {
        let result = parse_catalog("scenes: [{ id: 3, steps: 7 }]", CatalogFormat::Yaml);

        assert!(matches!(result, Err(DomainError::Catalog(_))));
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(
            CatalogFormat::from_path(Path::new("scenes.JSON")),
            CatalogFormat::Json
        );
        assert_eq!(
            CatalogFormat::from_path(Path::new("scenes.yaml")),
            CatalogFormat::Yaml
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_a_catalog_error() {
        let result = load_catalog(Path::new("/nonexistent/waymark/catalog.yaml")).await;

        assert!(matches!(result, Err(DomainError::Catalog(_))));
    }
}
