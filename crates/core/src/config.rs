//! TOML-based configuration for the mapping provider.
//!
//! The host runtime resolves configuration once at startup, either from an
//! untyped settings table it already parsed ([`MapperConfig::parse`], total)
//! or from the provider's own TOML file
//! ([`MapperConfig::load_from_file`], strict). Sensitive values are stored
//! as `_env` fields that reference environment variable names; the actual
//! secrets are resolved at runtime via [`MapperConfig::resolve_env_vars`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::identity::localpart::LocalpartMapping;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Immutable provider configuration, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Attribute used as the stable remote identifier and as the localpart
    /// source. Default `uid`. Always non-empty: an absent or empty value
    /// falls back to the default.
    #[serde(default = "default_subject_attribute")]
    pub subject_attribute: String,

    /// Auxiliary attribute names used for display-name composition and audit
    /// bookkeeping.
    #[serde(default)]
    pub attributes: AttributeNames,

    /// Named transform applied to the subject value before collision
    /// disambiguation.
    #[serde(default)]
    pub localpart_mapping: LocalpartMapping,

    /// Display-name policy when only one of given name / surname is present.
    #[serde(default)]
    pub display_name_fallback: DisplayNameFallback,

    /// Relational audit store settings.
    #[serde(default)]
    pub audit_store: AuditStoreConfig,

    /// Flat-file audit log settings.
    #[serde(default)]
    pub audit_log: AuditLogConfig,
}

fn default_subject_attribute() -> String {
    "uid".into()
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            subject_attribute: default_subject_attribute(),
            attributes: AttributeNames::default(),
            localpart_mapping: LocalpartMapping::default(),
            display_name_fallback: DisplayNameFallback::default(),
            audit_store: AuditStoreConfig::default(),
            audit_log: AuditLogConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute names
// ---------------------------------------------------------------------------

/// Names of the auxiliary assertion attributes. All of these are optional at
/// mapping time: absent attributes degrade to empty or absent values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeNames {
    /// Dedicated display-name attribute, used verbatim when present. Most
    /// IdPs that prompted this provider do not assert one.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Given-name attribute. Default `givenName`.
    #[serde(default = "default_given_name")]
    pub given_name: String,

    /// Surname attribute. Default `surname`.
    #[serde(default = "default_surname")]
    pub surname: String,

    /// Email attribute (multi-valued). Default `email`.
    #[serde(default = "default_email")]
    pub email: String,

    /// Organizational-unit attribute (multi-valued). Default `ou`.
    #[serde(default = "default_organizational_unit")]
    pub organizational_unit: String,

    /// Affiliation attribute (multi-valued). Default `eduPersonAffiliation`.
    #[serde(default = "default_affiliation")]
    pub affiliation: String,
}

fn default_given_name() -> String {
    "givenName".into()
}
fn default_surname() -> String {
    "surname".into()
}
fn default_email() -> String {
    "email".into()
}
fn default_organizational_unit() -> String {
    "ou".into()
}
fn default_affiliation() -> String {
    "eduPersonAffiliation".into()
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            display_name: None,
            given_name: default_given_name(),
            surname: default_surname(),
            email: default_email(),
            organizational_unit: default_organizational_unit(),
            affiliation: default_affiliation(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display-name fallback policy
// ---------------------------------------------------------------------------

/// Policy applied when exactly one of the given-name / surname halves is
/// present in the assertion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayNameFallback {
    /// Leave the display name absent; the host falls back to the localpart.
    #[default]
    Omit,
    /// Use whichever half is available on its own.
    Partial,
    /// Use the unsuffixed localpart base as the display name.
    Localpart,
}

impl DisplayNameFallback {
    /// Look up a policy by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "omit" => Some(Self::Omit),
            "partial" => Some(Self::Partial),
            "localpart" => Some(Self::Localpart),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Audit store
// ---------------------------------------------------------------------------

/// Relational audit store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStoreConfig {
    /// Whether to append an audit row per mapping call. Default off.
    #[serde(default)]
    pub enabled: bool,

    /// Database server host. Default `localhost`.
    #[serde(default = "default_store_host")]
    pub host: String,

    /// Database server port. Default 5432.
    #[serde(default = "default_store_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Database user.
    #[serde(default)]
    pub user: String,

    /// Environment variable holding the database password.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_store_host() -> String {
    "localhost".into()
}
fn default_store_port() -> u16 {
    5432
}

impl Default for AuditStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_store_host(),
            port: default_store_port(),
            database: String::new(),
            user: String::new(),
            password_env: None,
            password: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

/// Flat-file audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditLogConfig {
    /// Whether to append a log line per mapping call. Default off.
    #[serde(default)]
    pub enabled: bool,

    /// Path of the append-only log file.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Parsing, loading & resolving
// ---------------------------------------------------------------------------

impl MapperConfig {
    /// Build a config from an untyped settings table.
    ///
    /// Total: never fails. Absent, empty, or wrongly-typed values fall back
    /// to their defaults; an unknown strategy or policy name logs a warning
    /// and keeps the default.
    pub fn parse(raw: &toml::Table) -> Self {
        let mut config = MapperConfig::default();

        if let Some(value) = str_key(raw, "subject_attribute") {
            config.subject_attribute = value;
        }

        if let Some(name) = str_key(raw, "localpart_mapping") {
            match LocalpartMapping::from_name(&name) {
                Some(mapping) => config.localpart_mapping = mapping,
                None => warn!(name, "unknown localpart_mapping, keeping passthrough"),
            }
        }

        if let Some(name) = str_key(raw, "display_name_fallback") {
            match DisplayNameFallback::from_name(&name) {
                Some(policy) => config.display_name_fallback = policy,
                None => warn!(name, "unknown display_name_fallback, keeping omit"),
            }
        }

        if let Some(attrs) = raw.get("attributes").and_then(|v| v.as_table()) {
            if let Some(value) = str_key(attrs, "display_name") {
                config.attributes.display_name = Some(value);
            }
            if let Some(value) = str_key(attrs, "given_name") {
                config.attributes.given_name = value;
            }
            if let Some(value) = str_key(attrs, "surname") {
                config.attributes.surname = value;
            }
            if let Some(value) = str_key(attrs, "email") {
                config.attributes.email = value;
            }
            if let Some(value) = str_key(attrs, "organizational_unit") {
                config.attributes.organizational_unit = value;
            }
            if let Some(value) = str_key(attrs, "affiliation") {
                config.attributes.affiliation = value;
            }
        }

        if let Some(store) = raw.get("audit_store").and_then(|v| v.as_table()) {
            if let Some(enabled) = store.get("enabled").and_then(|v| v.as_bool()) {
                config.audit_store.enabled = enabled;
            }
            if let Some(value) = str_key(store, "host") {
                config.audit_store.host = value;
            }
            if let Some(port) = store
                .get("port")
                .and_then(|v| v.as_integer())
                .and_then(|p| u16::try_from(p).ok())
            {
                config.audit_store.port = port;
            }
            if let Some(value) = str_key(store, "database") {
                config.audit_store.database = value;
            }
            if let Some(value) = str_key(store, "user") {
                config.audit_store.user = value;
            }
            if let Some(value) = str_key(store, "password_env") {
                config.audit_store.password_env = Some(value);
            }
        }

        if let Some(log) = raw.get("audit_log").and_then(|v| v.as_table()) {
            if let Some(enabled) = log.get("enabled").and_then(|v| v.as_bool()) {
                config.audit_log.enabled = enabled;
            }
            if let Some(value) = str_key(log, "path") {
                config.audit_log.path = Some(PathBuf::from(value));
            }
        }

        debug!(
            subject_attribute = %config.subject_attribute,
            "parsed provider settings"
        );
        config
    }

    /// Load a [`MapperConfig`] from a TOML file at the given path.
    ///
    /// Unlike [`parse`](Self::parse), this path is strict: a malformed file
    /// is an operator error and fails loudly. This does **not** resolve
    /// environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MapperConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `*_env` fields from environment variables and populate the
    /// corresponding resolved fields.
    ///
    /// A missing variable logs a warning but does **not** fail -- an audit
    /// store without a password is still usable against trust-authenticated
    /// servers.
    pub fn resolve_env_vars(&mut self) {
        if let Some(ref env_name) = self.audit_store.password_env {
            self.audit_store.password =
                resolve_optional_env(env_name, "audit_store.password_env");
        }
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_attribute.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "subject_attribute".into(),
                detail: "subject attribute must not be empty".into(),
            });
        }
        if self.audit_store.enabled {
            if self.audit_store.database.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "audit_store.database".into(),
                    detail: "database name is required when the audit store is enabled".into(),
                });
            }
            if self.audit_store.user.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "audit_store.user".into(),
                    detail: "database user is required when the audit store is enabled".into(),
                });
            }
        }
        if self.audit_log.enabled && self.audit_log.path.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "audit_log.path".into(),
                detail: "log path is required when the audit log is enabled".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Attribute sets the host runtime should request from the IdP:
    /// `(required, optional)`.
    ///
    /// The required set always contains the subject attribute. The optional
    /// set contains the configured auxiliary attributes; those degrade
    /// gracefully when missing at mapping time.
    pub fn attribute_requirements(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let required = BTreeSet::from([self.subject_attribute.clone()]);

        let mut optional = BTreeSet::new();
        if let Some(ref name) = self.attributes.display_name {
            optional.insert(name.clone());
        }
        optional.insert(self.attributes.given_name.clone());
        optional.insert(self.attributes.surname.clone());
        optional.insert(self.attributes.email.clone());
        optional.insert(self.attributes.organizational_unit.clone());
        optional.insert(self.attributes.affiliation.clone());
        optional.remove(&self.subject_attribute);

        (required, optional)
    }
}

/// Read a non-empty string value from a table, if present.
fn str_key(table: &toml::Table, key: &str) -> Option<String> {
    table
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
