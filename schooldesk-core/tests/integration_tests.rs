//! Integration tests for schooldesk-core infrastructure

use schooldesk_core::{
    validation_error, ErrorContext, Role, SchoolDeskConfig, SchoolDeskError, StorageBackend,
};

#[test]
fn test_error_handling() {
    let validation = validation_error!("Too short", "password", "login");
    match &validation {
        SchoolDeskError::Validation { field, .. } => {
            assert_eq!(field.as_deref(), Some("password"))
        }
        _ => panic!("Expected Validation error"),
    }
    assert_eq!(validation.context().component, "login");
    assert!(!validation.context().error_id.is_empty());
    assert_eq!(validation.context().recovery_suggestions.len(), 1);

    // Logging without a subscriber must not panic
    validation.log();

    let mut config = SchoolDeskConfig::default();
    config.server.port = 0;
    let error = config.validate().unwrap_err();
    assert!(matches!(error, SchoolDeskError::Config { .. }));
    assert_eq!(error.context().operation.as_deref(), Some("validate"));
    error.log();
}

#[test]
fn test_error_context_builder() {
    let context = ErrorContext::new("session")
        .with_operation("create_session")
        .with_metadata("role", "parent")
        .with_suggestion("Retry after freeing storage");

    assert_eq!(context.operation.as_deref(), Some("create_session"));
    assert_eq!(context.metadata.get("role").map(String::as_str), Some("parent"));
    assert_eq!(context.recovery_suggestions.len(), 1);
}

#[test]
fn test_layered_config_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schooldesk.toml");
    std::fs::write(
        &path,
        r#"
seed_demo_data = false

[server]
port = 8181

[session]
activity_debounce_secs = 10

[session.storage]
kind = "file"
dir = "/tmp/schooldesk-test-sessions"
"#,
    )
    .unwrap();

    let config = SchoolDeskConfig::load(Some(&path)).unwrap();
    assert!(!config.seed_demo_data);
    assert_eq!(config.server.port, 8181);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.session.activity_debounce_secs, 10);
    assert_eq!(config.session.revalidation_interval_secs, 60);
    assert_eq!(
        config.session.storage,
        StorageBackend::File {
            dir: Some("/tmp/schooldesk-test-sessions".into())
        }
    );
    assert_eq!(
        config.session.roles.settings_for(&Role::Parent).session_minutes,
        240
    );
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = SchoolDeskConfig::load(Some(std::path::Path::new(
        "/definitely/not/here/schooldesk.toml",
    )));
    assert!(matches!(result, Err(SchoolDeskError::Config { .. })));
}
