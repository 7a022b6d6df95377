//! Integration tests for `JsonFileGateway`.

use std::path::PathBuf;

use uuid::Uuid;
use waymark_core::error::DomainError;
use waymark_core::gateway::ProgressGateway;
use waymark_core::progress::{Namespace, RuntimeProgress};
use waymark_progress_store::JsonFileGateway;

/// A fresh directory under the system temp dir.
fn scratch_root() -> PathBuf {
    std::env::temp_dir().join(format!("waymark-store-{}", Uuid::new_v4()))
}

fn sample_progress() -> RuntimeProgress {
    let mut progress = RuntimeProgress::default();
    progress.set_flag("seen_shop", true);
    progress.set_flag("skipped_intro", false);
    progress.set_counter("water_realm_progress", 2);
    progress.mark_completed("home-intro", 1_768_471_200_000);
    progress.touch("battle-tutorial", 1_768_471_260_000);
    progress
}

// --- load ---

#[tokio::test]
async fn test_load_missing_record_returns_none() {
    let gateway = JsonFileGateway::new(scratch_root());

    let loaded = gateway.load(&Namespace::anonymous()).await.unwrap();

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_load_corrupt_record_is_persistence_error() {
    // Arrange
    let root = scratch_root();
    let gateway = JsonFileGateway::new(&root);
    let namespace = Namespace::user("player-1");
    tokio::fs::create_dir_all(&root).await.unwrap();
    tokio::fs::write(gateway.record_path(&namespace), b"{ not json")
        .await
        .unwrap();

    // Act
    let result = gateway.load(&namespace).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Persistence(_))));
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

// --- save + load round-trip ---

#[tokio::test]
async fn test_save_then_load_round_trips() {
    // Arrange
    let root = scratch_root();
    let gateway = JsonFileGateway::new(&root);
    let namespace = Namespace::user("player-1");
    let progress = sample_progress();

    // Act
    gateway.save(&namespace, &progress).await.unwrap();
    let loaded = gateway.load(&namespace).await.unwrap();

    // Assert
    assert_eq!(loaded, Some(progress));
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_saved_record_uses_flat_camel_case_layout() {
    let root = scratch_root();
    let gateway = JsonFileGateway::new(&root);
    let namespace = Namespace::anonymous();

    gateway.save(&namespace, &sample_progress()).await.unwrap();

    let bytes = tokio::fs::read(gateway.record_path(&namespace)).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["flags"]["seen_shop"], true);
    assert_eq!(json["progress"]["water_realm_progress"], 2);
    assert_eq!(json["completedScenes"], serde_json::json!(["home-intro"]));
    assert_eq!(json["lastSeenAt"]["battle-tutorial"], 1_768_471_260_000_i64);
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_save_overwrites_and_leaves_no_staging_file() {
    // Arrange
    let root = scratch_root();
    let gateway = JsonFileGateway::new(&root);
    let namespace = Namespace::user("player-1");
    gateway.save(&namespace, &sample_progress()).await.unwrap();

    // Act
    gateway
        .save(&namespace, &RuntimeProgress::default())
        .await
        .unwrap();

    // Assert
    let loaded = gateway.load(&namespace).await.unwrap();
    assert_eq!(loaded, Some(RuntimeProgress::default()));
    let mut entries = tokio::fs::read_dir(&root).await.unwrap();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    assert_eq!(names, vec!["player-1.json".to_owned()]);
    tokio::fs::remove_dir_all(&root).await.unwrap();
}

#[tokio::test]
async fn test_namespaces_do_not_share_records() {
    let root = scratch_root();
    let gateway = JsonFileGateway::new(&root);

    gateway
        .save(&Namespace::user("a/b"), &sample_progress())
        .await
        .unwrap();

    assert!(gateway.load(&Namespace::user("a_b")).await.unwrap().is_none());
    assert!(gateway.load(&Namespace::user("a/b")).await.unwrap().is_some());
    tokio::fs::remove_dir_all(&root).await.unwrap();
}
