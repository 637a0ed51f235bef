//! Audit side channels for SSO logins.
//!
//! Two independent, individually toggleable channels record each mapping
//! call: a relational store row and a flat-file log line. Both are
//! best-effort observability features: a channel failure is logged and never
//! aborts or alters the identity result. The [`Auditor`] facade dispatches
//! to all configured channels and reports an error only when every one of
//! them failed.

pub mod log;
pub mod store;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{AuditLogConfig, AuditStoreConfig};
use crate::errors::SideChannelError;

/// One mapping call's worth of audit data.
///
/// The timestamp is produced once per mapping call, so the store row and the
/// log line for the same login agree.
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    /// The IdP's stable subject identifier.
    pub subject: &'a str,
    /// Organizational-unit memberships, in asserted order.
    pub organizational_units: &'a [String],
    /// Given name, when asserted.
    pub given_name: Option<&'a str>,
    /// Surname, when asserted.
    pub surname: Option<&'a str>,
    /// Email addresses, in asserted order.
    pub emails: &'a [String],
    /// Affiliations (e.g. `student`, `member`), in asserted order.
    pub affiliations: &'a [String],
    /// UTC instant of the mapping call.
    pub timestamp: DateTime<Utc>,
}

/// Unified auditor that dispatches to all configured channels.
pub struct Auditor {
    store: Option<store::AuditStore>,
    log: Option<log::AuditLog>,
}

impl Auditor {
    /// Create an auditor from the audit configuration sections.
    pub fn new(store_config: &AuditStoreConfig, log_config: &AuditLogConfig) -> Self {
        let store = if store_config.enabled {
            info!(
                host = %store_config.host,
                database = %store_config.database,
                "audit store enabled"
            );
            Some(store::AuditStore::new(store_config.clone()))
        } else {
            None
        };

        let log = match (log_config.enabled, &log_config.path) {
            (true, Some(path)) => {
                info!(path = %path.display(), "audit log enabled");
                Some(log::AuditLog::new(path.clone()))
            }
            (true, None) => {
                warn!("audit log enabled but no path configured, skipping channel");
                None
            }
            _ => None,
        };

        Self { store, log }
    }

    /// Record one mapping call on every configured channel.
    ///
    /// Per-channel failures are logged and the remaining channels still run;
    /// the call errs only when all configured channels failed.
    pub fn record(&self, record: &AuditRecord<'_>) -> Result<(), SideChannelError> {
        let mut channels = 0;
        let mut errors = Vec::new();

        if let Some(ref store) = self.store {
            channels += 1;
            if let Err(e) = store.append(record) {
                warn!(subject = %record.subject, error = %e, "audit store append failed");
                errors.push(format!("store: {}", e));
            }
        }

        if let Some(ref log) = self.log {
            channels += 1;
            if let Err(e) = log.append(record.subject, record.timestamp) {
                warn!(subject = %record.subject, error = %e, "audit log append failed");
                errors.push(format!("log: {}", e));
            }
        }

        if channels > 0 && errors.len() == channels {
            return Err(SideChannelError::AllChannelsFailed(errors.join("; ")));
        }
        Ok(())
    }

    /// Return whether any audit channel is configured.
    pub fn is_configured(&self) -> bool {
        self.store.is_some() || self.log.is_some()
    }
}
