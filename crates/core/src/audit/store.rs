//! Relational audit store channel.
//!
//! Appends one row per mapping call to the `user_external_saml` table of an
//! external PostgreSQL database. Rows are append-only: repeated logins for
//! the same subject produce new rows, never updates. Every append opens a
//! fresh connection and closes it afterwards; there is no pooling, no
//! transaction spanning calls, and no retry.

use postgres::{Client, NoTls};
use tracing::debug;

use super::AuditRecord;
use crate::config::AuditStoreConfig;
use crate::errors::SideChannelError;

/// Delimiter joining multi-valued organizational units into the `ou` text
/// column. Matches the audit-log line delimiter.
const OU_DELIMITER: &str = ";";

const INSERT_SQL: &str = "INSERT INTO user_external_saml \
     (tuid, ou, givenname, surname, email, edu_person_affiliation, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

/// PostgreSQL audit channel.
pub struct AuditStore {
    config: AuditStoreConfig,
}

impl AuditStore {
    /// Create a store channel from connection settings. No connection is
    /// made until the first append.
    pub fn new(config: AuditStoreConfig) -> Self {
        Self { config }
    }

    /// Insert one audit row.
    pub fn append(&self, record: &AuditRecord<'_>) -> Result<(), SideChannelError> {
        let mut client = self.connect()?;

        let ou = join_units(record.organizational_units);
        client.execute(
            INSERT_SQL,
            &[
                &record.subject,
                &ou,
                &record.given_name,
                &record.surname,
                &record.emails,
                &record.affiliations,
                &record.timestamp,
            ],
        )?;

        debug!(subject = %record.subject, "audit row inserted");
        Ok(())
    }

    /// Open a fresh connection from the configured parameters.
    fn connect(&self) -> Result<Client, SideChannelError> {
        let client = self.client_config().connect(NoTls)?;
        Ok(client)
    }

    fn client_config(&self) -> postgres::Config {
        let mut pg = postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .dbname(&self.config.database)
            .user(&self.config.user);
        if let Some(ref password) = self.config.password {
            pg.password(password);
        }
        pg
    }
}

/// Join organizational units into the single `ou` text column.
fn join_units(units: &[String]) -> String {
    units.join(OU_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgres::config::Host;

    #[test]
    fn test_join_units() {
        assert_eq!(join_units(&[]), "");
        assert_eq!(join_units(&["etit".into()]), "etit");
        assert_eq!(join_units(&["etit".into(), "dlz".into()]), "etit;dlz");
    }

    #[test]
    fn test_client_config_from_settings() {
        let store = AuditStore::new(AuditStoreConfig {
            enabled: true,
            host: "db.example.org".into(),
            port: 5433,
            database: "sso_audit".into(),
            user: "samlmap".into(),
            password_env: None,
            password: Some("s3cret".into()),
        });

        let pg = store.client_config();
        assert_eq!(pg.get_hosts(), &[Host::Tcp("db.example.org".into())]);
        assert_eq!(pg.get_ports(), &[5433]);
        assert_eq!(pg.get_dbname(), Some("sso_audit"));
        assert_eq!(pg.get_user(), Some("samlmap"));
        assert_eq!(pg.get_password(), Some("s3cret".as_bytes()));
    }

    #[test]
    fn test_client_config_without_password() {
        let store = AuditStore::new(AuditStoreConfig {
            enabled: true,
            database: "sso_audit".into(),
            user: "samlmap".into(),
            ..AuditStoreConfig::default()
        });

        let pg = store.client_config();
        assert_eq!(pg.get_password(), None);
    }
}
