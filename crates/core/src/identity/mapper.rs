//! Core assertion-to-identity mapping logic.
//!
//! [`MappingProvider`] turns the attributes asserted by an identity provider
//! into chat-server account attributes: a localpart, an optional display
//! name, and any email addresses. The host runtime calls
//! [`MappingProvider::map_to_identity`] once per login attempt and calls it
//! again with an incremented retry count whenever the proposed localpart
//! turns out to be taken.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assertion::Assertion;
use crate::audit::{AuditRecord, Auditor};
use crate::config::{DisplayNameFallback, MapperConfig};
use crate::errors::MappingError;

/// Account attributes produced by one mapping call.
///
/// Produced fresh on every call and never retained by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityResult {
    /// Localpart of the account identifier, collision suffix included.
    pub localpart: String,
    /// Display name, when a source attribute was available.
    pub display_name: Option<String>,
    /// Email addresses asserted for the subject; may be empty.
    pub emails: Vec<String>,
}

/// Maps IdP assertions to local account identities.
///
/// Holds only the immutable configuration and the audit channel handles, so
/// concurrent mapping calls for independent logins need no locking.
pub struct MappingProvider {
    config: MapperConfig,
    auditor: Auditor,
}

impl MappingProvider {
    /// Create a provider from a resolved configuration.
    pub fn new(config: MapperConfig) -> Self {
        info!(
            subject_attribute = %config.subject_attribute,
            localpart_mapping = config.localpart_mapping.name(),
            "initializing mapping provider"
        );
        let auditor = Auditor::new(&config.audit_store, &config.audit_log);
        Self { config, auditor }
    }

    /// The configuration this provider was built with.
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Extract the IdP's stable identifier for the subject.
    ///
    /// This is the join key against any existing local account and is never
    /// defaulted: an assertion without the subject attribute fails.
    pub fn remote_user_id(&self, assertion: &Assertion) -> Result<String, MappingError> {
        match assertion.first(&self.config.subject_attribute) {
            Some(value) => Ok(value.to_string()),
            None => {
                warn!(
                    attribute = %self.config.subject_attribute,
                    "assertion lacks the subject attribute"
                );
                Err(MappingError::MissingRequiredAttribute {
                    attribute: self.config.subject_attribute.clone(),
                })
            }
        }
    }

    /// Map an assertion to account attributes.
    ///
    /// `retry_count` is how many times the host has already rejected a
    /// previously returned localpart as taken. A non-zero count appends its
    /// decimal representation to the localpart base with no separator
    /// (base `jdoe`, retry 2 -> `jdoe2`), so distinct retry counts never
    /// collide with each other. Identical `(assertion, retry_count)` inputs
    /// always produce an identical result.
    ///
    /// The configured audit channels fire after the identity is computed;
    /// their failure is logged and never alters the returned result.
    pub fn map_to_identity(
        &self,
        assertion: &Assertion,
        retry_count: u32,
    ) -> Result<IdentityResult, MappingError> {
        let subject = self.remote_user_id(assertion)?;

        let base = self.config.localpart_mapping.apply(&subject);
        let localpart = if retry_count > 0 {
            format!("{}{}", base, retry_count)
        } else {
            base.clone()
        };

        let display_name = self.display_name(assertion, &base);
        let emails = assertion.values(&self.config.attributes.email).to_vec();

        debug!(
            subject = %subject,
            localpart = %localpart,
            retry_count,
            "mapped assertion to identity"
        );

        self.record_audit(assertion, &subject);

        Ok(IdentityResult {
            localpart,
            display_name,
            emails,
        })
    }

    /// Compose the display name from the configured sources.
    ///
    /// The dedicated display-name attribute wins when configured and
    /// present. Otherwise given name and surname compose when both are
    /// present; a single present half is handled by the configured fallback
    /// policy.
    fn display_name(&self, assertion: &Assertion, base: &str) -> Option<String> {
        let attrs = &self.config.attributes;

        if let Some(ref name_attr) = attrs.display_name {
            if let Some(value) = assertion.first(name_attr) {
                return Some(value.to_string());
            }
        }

        let given = assertion.first(&attrs.given_name);
        let surname = assertion.first(&attrs.surname);
        match (given, surname) {
            (Some(given), Some(surname)) => Some(format!("{} {}", given, surname)),
            (None, None) => None,
            (given, surname) => match self.config.display_name_fallback {
                DisplayNameFallback::Omit => None,
                DisplayNameFallback::Partial => given.or(surname).map(str::to_string),
                DisplayNameFallback::Localpart => Some(base.to_string()),
            },
        }
    }

    /// Best-effort audit dispatch.
    fn record_audit(&self, assertion: &Assertion, subject: &str) {
        if !self.auditor.is_configured() {
            return;
        }

        let attrs = &self.config.attributes;
        let record = AuditRecord {
            subject,
            organizational_units: assertion.values(&attrs.organizational_unit),
            given_name: assertion.first(&attrs.given_name),
            surname: assertion.first(&attrs.surname),
            emails: assertion.values(&attrs.email),
            affiliations: assertion.values(&attrs.affiliation),
            timestamp: Utc::now(),
        };

        if let Err(error) = self.auditor.record(&record) {
            warn!(subject = %subject, error = %error, "audit side channel failed");
        }
    }
}
