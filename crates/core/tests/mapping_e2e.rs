//! End-to-end tests for the assertion-to-identity mapping flow.
//!
//! These tests exercise the real `MappingProvider` the way the host runtime
//! drives it: configuration resolved once at startup, then one
//! `map_to_identity` call per login attempt, re-invoked with an incremented
//! retry count on localpart collision. Audit channels use real temp files;
//! no network I/O.

use std::path::PathBuf;

use tempfile::TempDir;

use samlmap_core::assertion::Assertion;
use samlmap_core::config::MapperConfig;
use samlmap_core::identity::MappingProvider;

// ===========================================================================
// Helpers
// ===========================================================================

fn jane_assertion() -> Assertion {
    Assertion::new()
        .with("uid", &["jdoe"])
        .with("givenName", &["Jane"])
        .with("surname", &["Doe"])
        .with("email", &["jane@example.org"])
        .with("ou", &["etit"])
        .with("eduPersonAffiliation", &["student", "member"])
}

fn provider_with_log(path: PathBuf) -> MappingProvider {
    let mut config = MapperConfig::default();
    config.audit_log.enabled = true;
    config.audit_log.path = Some(path);
    config.validate().unwrap();
    MappingProvider::new(config)
}

// ===========================================================================
// Login scenarios
// ===========================================================================

#[test]
fn first_login_maps_all_attributes() {
    let provider = MappingProvider::new(MapperConfig::default());

    let result = provider.map_to_identity(&jane_assertion(), 0).unwrap();
    assert_eq!(result.localpart, "jdoe");
    assert_eq!(result.display_name.as_deref(), Some("Jane Doe"));
    assert_eq!(result.emails, vec!["jane@example.org"]);
}

#[test]
fn collision_retry_changes_only_the_localpart() {
    let provider = MappingProvider::new(MapperConfig::default());
    let assertion = jane_assertion();

    let first = provider.map_to_identity(&assertion, 0).unwrap();
    let retried = provider.map_to_identity(&assertion, 2).unwrap();

    assert_eq!(retried.localpart, "jdoe2");
    assert_eq!(retried.display_name, first.display_name);
    assert_eq!(retried.emails, first.emails);
}

#[test]
fn missing_subject_attribute_rejects_the_login() {
    let provider = MappingProvider::new(MapperConfig::default());
    let assertion = Assertion::new()
        .with("givenName", &["Jane"])
        .with("surname", &["Doe"]);

    assert!(provider.map_to_identity(&assertion, 0).is_err());
    assert!(provider.remote_user_id(&assertion).is_err());
}

#[test]
fn missing_email_attribute_yields_empty_list() {
    let provider = MappingProvider::new(MapperConfig::default());
    let assertion = Assertion::new()
        .with("uid", &["jdoe"])
        .with("givenName", &["Jane"])
        .with("surname", &["Doe"]);

    let result = provider.map_to_identity(&assertion, 0).unwrap();
    assert_eq!(result.emails, Vec::<String>::new());
}

#[test]
fn disabled_audit_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audit.log");

    // Audit log path configured but the channel stays disabled.
    let mut config = MapperConfig::default();
    config.audit_log.path = Some(log_path.clone());
    let provider = MappingProvider::new(config);

    let result = provider.map_to_identity(&jane_assertion(), 0).unwrap();
    assert_eq!(result.localpart, "jdoe");
    assert!(!log_path.exists());
}

// ===========================================================================
// Audit log side channel
// ===========================================================================

#[test]
fn audit_log_records_each_login() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audit.log");
    let provider = provider_with_log(log_path.clone());

    provider.map_to_identity(&jane_assertion(), 0).unwrap();
    provider.map_to_identity(&jane_assertion(), 1).unwrap();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        // `<subject>;<UTC timestamp>`, subject is the unsuffixed remote id.
        let (subject, timestamp) = line.split_once(';').unwrap();
        assert_eq!(subject, "jdoe");
        assert!(!timestamp.is_empty());
    }
}

#[test]
fn audit_log_failure_does_not_affect_the_identity() {
    let dir = TempDir::new().unwrap();
    // Parent directory is missing, so every append fails.
    let log_path = dir.path().join("missing").join("audit.log");
    let provider = provider_with_log(log_path.clone());

    let result = provider.map_to_identity(&jane_assertion(), 0).unwrap();
    assert_eq!(result.localpart, "jdoe");
    assert_eq!(result.display_name.as_deref(), Some("Jane Doe"));
    assert!(!log_path.exists());
}

// ===========================================================================
// Startup contract
// ===========================================================================

#[test]
fn host_settings_table_resolves_with_defaults() {
    let raw: toml::Table = toml::from_str(
        r#"
subject_attribute = "uid"

[audit_log]
enabled = false
"#,
    )
    .unwrap();

    let config = MapperConfig::parse(&raw);
    config.validate().unwrap();

    let (required, optional) = config.attribute_requirements();
    assert!(required.contains("uid"));
    assert!(optional.contains("givenName"));
    assert!(optional.contains("surname"));

    let provider = MappingProvider::new(config);
    let result = provider.map_to_identity(&jane_assertion(), 0).unwrap();
    assert_eq!(result.localpart, "jdoe");
}
