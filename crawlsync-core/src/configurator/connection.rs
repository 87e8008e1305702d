//! JDBC connection descriptor construction.

use crate::error::ConfigureError;
use crate::models::{ConnectionDescriptor, DatabaseProtocol};
use crate::security::SecretRecord;
use std::net::Ipv6Addr;
use url::Host;

/// Builds `jdbc:<protocol>://<host>:<port>/<dbname>` from resolved
/// credentials.
///
/// The host, port and database name are used exactly as stored apart from
/// trimming surrounding whitespace; nothing is percent-encoded or defaulted.
/// A bare IPv6 address is bracketed.
///
/// # Security
/// Failure reasons name the offending field but never include its value.
///
/// # Errors
/// Returns `ConfigureError::ConnectionBuildFailure` if:
/// - the host is not a valid domain or IP address
/// - the port is not an integer in 1..=65535
/// - the database name is empty or contains `/`, `?`, `#`, `;` or whitespace
/// - the username or password is empty
pub fn build_connection(
    protocol: DatabaseProtocol,
    secret: &SecretRecord,
) -> Result<ConnectionDescriptor, ConfigureError> {
    let host = url_host(secret.host())?;
    let port = parse_port(secret.port())?;
    let dbname = database_name(secret.dbname())?;

    if secret.username().trim().is_empty() {
        return Err(ConfigureError::connection_build("username", "username is empty"));
    }
    if !secret.has_password() {
        return Err(ConfigureError::connection_build("password", "password is empty"));
    }

    let url = format!(
        "jdbc:{}://{}:{}/{}",
        protocol.jdbc_subprotocol(),
        host,
        port,
        dbname
    );

    Ok(ConnectionDescriptor::new(
        url,
        secret.username().to_string(),
        secret.expose_password(),
    ))
}

fn url_host(raw: &str) -> Result<String, ConfigureError> {
    let host = raw.trim();
    if host.is_empty() {
        return Err(ConfigureError::connection_build("host", "host is empty"));
    }

    if let Ok(address) = host.parse::<Ipv6Addr>() {
        return Ok(format!("[{}]", address));
    }

    Host::parse(host)
        .map(|_| host.to_string())
        .map_err(|e| ConfigureError::connection_build("host", format!("not a valid host: {}", e)))
}

fn parse_port(raw: &str) -> Result<u16, ConfigureError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigureError::connection_build(
            "port",
            "port must be an integer between 1 and 65535",
        )),
        Ok(port) => Ok(port),
    }
}

fn database_name(raw: &str) -> Result<&str, ConfigureError> {
    let dbname = raw.trim();
    if dbname.is_empty() {
        return Err(ConfigureError::connection_build("dbname", "database name is empty"));
    }
    if dbname
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | ';') || c.is_whitespace())
    {
        return Err(ConfigureError::connection_build(
            "dbname",
            "database name contains a URL delimiter or whitespace",
        ));
    }
    Ok(dbname)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(host: &str, port: &str, dbname: &str) -> SecretRecord {
        SecretRecord::new(host, port, dbname, "admin", "hunter22")
    }

    fn failed_field(result: Result<ConnectionDescriptor, ConfigureError>) -> &'static str {
        match result {
            Err(ConfigureError::ConnectionBuildFailure { field, .. }) => field,
            other => panic!("expected ConnectionBuildFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_postgres_url() {
        let descriptor = build_connection(
            DatabaseProtocol::Postgresql,
            &record("db.example.com", "5432", "my_initial_database"),
        )
        .unwrap();

        assert_eq!(
            descriptor.url(),
            "jdbc:postgresql://db.example.com:5432/my_initial_database"
        );
        assert_eq!(descriptor.username(), "admin");
        assert_eq!(descriptor.expose_password(), "hunter22");
    }

    #[test]
    fn test_protocol_is_generic() {
        let descriptor =
            build_connection(DatabaseProtocol::Mysql, &record("10.0.0.5", "3306", "shop")).unwrap();
        assert_eq!(descriptor.url(), "jdbc:mysql://10.0.0.5:3306/shop");
    }

    #[test]
    fn test_ipv6_host_bracketed() {
        let bare = build_connection(DatabaseProtocol::Postgresql, &record("::1", "5432", "d")).unwrap();
        let bracketed =
            build_connection(DatabaseProtocol::Postgresql, &record("[::1]", "5432", "d")).unwrap();

        assert_eq!(bare.url(), "jdbc:postgresql://[::1]:5432/d");
        assert_eq!(bracketed.url(), bare.url());
    }

    #[test]
    fn test_port_out_of_range() {
        for port in ["0", "65536", "-1", "abc", "5432.0", ""] {
            assert_eq!(
                failed_field(build_connection(
                    DatabaseProtocol::Postgresql,
                    &record("h", port, "d")
                )),
                "port",
                "port {port:?}"
            );
        }
    }

    #[test]
    fn test_invalid_host() {
        for host in ["bad host", "user@host", "h:5432", "  "] {
            assert_eq!(
                failed_field(build_connection(
                    DatabaseProtocol::Postgresql,
                    &record(host, "5432", "d")
                )),
                "host",
                "host {host:?}"
            );
        }
    }

    #[test]
    fn test_invalid_dbname() {
        for dbname in ["a/b", "a?x", "a#b", "a;b", "my db"] {
            assert_eq!(
                failed_field(build_connection(
                    DatabaseProtocol::Postgresql,
                    &record("h", "5432", dbname)
                )),
                "dbname"
            );
        }
    }

    #[test]
    fn test_failure_does_not_echo_values() {
        let secret = SecretRecord::new("h", "5432", "d", "admin", "hunter22");
        let bad_port = SecretRecord::new("h", "hunter22", "d", "admin", "hunter22");

        assert!(build_connection(DatabaseProtocol::Postgresql, &secret).is_ok());
        let error = build_connection(DatabaseProtocol::Postgresql, &bad_port).unwrap_err();
        assert!(!error.to_string().contains("hunter22"));
    }

    proptest! {
        #[test]
        fn prop_url_contains_fields_in_order(
            host in "[a-z][a-z0-9]{0,20}(\\.[a-z][a-z0-9]{0,10}){0,3}",
            port in 1u16..=u16::MAX,
            dbname in "[A-Za-z_][A-Za-z0-9_]{0,30}",
        ) {
            let descriptor = build_connection(
                DatabaseProtocol::Postgresql,
                &record(&host, &port.to_string(), &dbname),
            ).unwrap();

            prop_assert_eq!(
                descriptor.url(),
                format!("jdbc:postgresql://{}:{}/{}", host, port, dbname)
            );
        }
    }
}
