use crate::integration::support::{algorithms_catalog, Mirror};
use coursemirror::config::{MirrorConfig, StorageConfig};
use coursemirror::error::ApiError;
use coursemirror::tooling::cli::{CliContext, Commands};
use std::fs;

fn context_for(mirror: &Mirror) -> CliContext {
    let config = MirrorConfig {
        storage: StorageConfig {
            download_dir: mirror.root(),
            state_file: Some(mirror.store.path().to_path_buf()),
        },
        ..MirrorConfig::default()
    };
    CliContext::from_config(config).unwrap()
}

#[tokio::test]
async fn test_status_reports_tracked_and_missing_files() {
    let mirror = Mirror::new();
    mirror.sync(&algorithms_catalog()).await;
    fs::remove_file(mirror.path("Algorithms101", "Week 1", "notes.pdf")).unwrap();
    let before = fs::read(mirror.store.path()).unwrap();

    let output = context_for(&mirror)
        .execute(&Commands::Status {
            format: "json".to_string(),
        })
        .unwrap();

    let status: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(status["exists"], true);
    assert_eq!(status["courses"], 1);
    assert_eq!(status["modules_seen"], 1);
    assert_eq!(status["files_tracked"], 2);
    assert_eq!(status["files_missing"].as_array().unwrap().len(), 1);
    assert_eq!(fs::read(mirror.store.path()).unwrap(), before);
}

#[test]
fn test_status_without_state_file() {
    let mirror = Mirror::new();
    let output = context_for(&mirror)
        .execute(&Commands::Status {
            format: "text".to_string(),
        })
        .unwrap();

    assert!(output.contains("Synced: no"));
    assert!(!mirror.store.path().exists());
}

#[test]
fn test_sync_without_remote_settings_fails_before_touching_state() {
    let mirror = Mirror::new();
    let err = context_for(&mirror)
        .execute(&Commands::Sync {
            format: "text".to_string(),
            quiet: true,
        })
        .unwrap_err();

    assert!(matches!(err, ApiError::ConfigError(_)));
    assert!(!mirror.store.path().exists());
    assert!(!mirror.root().exists());
}

#[test]
fn test_unknown_output_format_is_rejected() {
    let mirror = Mirror::new();
    let err = context_for(&mirror)
        .execute(&Commands::Status {
            format: "yaml".to_string(),
        })
        .unwrap_err();

    assert!(err.to_string().contains("yaml"));
}
