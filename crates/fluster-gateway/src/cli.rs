use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use fluster_shortener::threat::DEFAULT_ENDPOINT;
use fluster_shortener::{ResolverSettings, SafeBrowsingSettings};
use fluster_storage::{PgSslMode, PostgresSettings};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "FLUSTER_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "FLUSTER_STORAGE";
pub const PG_HOST_ENV: &str = "PG_HOST";
pub const PG_PORT_ENV: &str = "PG_PORT";
pub const PG_USER_ENV: &str = "PG_USER";
pub const PG_PASSWORD_ENV: &str = "PG_PASSWORD";
pub const PG_DB_ENV: &str = "PG_DB";
pub const PG_SSL_MODE_ENV: &str = "PG_SSL_MODE";
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const SAFE_BROWSING_ENDPOINT_ENV: &str = "FLUSTER_SAFE_BROWSING_ENDPOINT";
pub const MAX_REDIRECTS_ENV: &str = "FLUSTER_MAX_REDIRECTS";
pub const HTTP_TIMEOUT_ENV: &str = "FLUSTER_HTTP_TIMEOUT_SECS";
pub const LAMBDA_ENV: &str = "LAMBDA";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fluster-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = PG_HOST_ENV, required_if_eq("storage", "postgres"))]
    pub pg_host: Option<String>,

    #[arg(long, env = PG_PORT_ENV, default_value_t = 5432)]
    pub pg_port: u16,

    #[arg(long, env = PG_USER_ENV, required_if_eq("storage", "postgres"))]
    pub pg_user: Option<String>,

    #[arg(
        long,
        env = PG_PASSWORD_ENV,
        hide_env_values = true,
        required_if_eq("storage", "postgres")
    )]
    pub pg_password: Option<String>,

    #[arg(long, env = PG_DB_ENV, required_if_eq("storage", "postgres"))]
    pub pg_db: Option<String>,

    /// One of disable, allow, prefer, require, verify-ca, verify-full.
    #[arg(long, env = PG_SSL_MODE_ENV, default_value = "require")]
    pub pg_ssl_mode: PgSslMode,

    #[arg(long, env = GOOGLE_API_KEY_ENV, hide_env_values = true)]
    pub google_api_key: String,

    #[arg(long, env = SAFE_BROWSING_ENDPOINT_ENV, default_value = DEFAULT_ENDPOINT)]
    pub safe_browsing_endpoint: String,

    #[arg(long, env = MAX_REDIRECTS_ENV, default_value_t = 10)]
    pub max_redirects: usize,

    /// Timeout for each outbound request, in seconds.
    #[arg(long, env = HTTP_TIMEOUT_ENV, default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Serve through the Lambda runtime instead of a TCP listener.
    #[arg(
        long,
        env = LAMBDA_ENV,
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub lambda: bool,

    /// Shorten a single URL, print its short code and exit.
    #[arg(long, value_name = "URL")]
    pub shorten: Option<String>,
}

impl CLI {
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings::builder()
            .max_hops(self.max_redirects)
            .request_timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
    }

    pub fn safe_browsing_settings(&self) -> SafeBrowsingSettings {
        SafeBrowsingSettings::builder()
            .api_key(self.google_api_key.clone())
            .endpoint(self.safe_browsing_endpoint.clone())
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
    }

    /// `None` unless every connection field is present.
    pub fn postgres_settings(&self) -> Option<PostgresSettings> {
        Some(
            PostgresSettings::builder()
                .host(self.pg_host.clone()?)
                .port(self.pg_port)
                .user(self.pg_user.clone()?)
                .password(self.pg_password.clone()?)
                .database(self.pg_db.clone()?)
                .ssl_mode(self.pg_ssl_mode)
                .build(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 3] = ["fluster-gateway", "--google-api-key", "test-key"];

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(REQUIRED).unwrap();

        assert_eq!(cli.listen_addr, DEFAULT_LISTEN_ADDR.parse().unwrap());
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert!(!cli.lambda);
        assert!(cli.shorten.is_none());
        assert!(cli.postgres_settings().is_none());

        let resolver = cli.resolver_settings();
        assert_eq!(resolver.max_hops, 10);
        assert_eq!(resolver.request_timeout, Duration::from_secs(10));

        let safe_browsing = cli.safe_browsing_settings();
        assert_eq!(safe_browsing.api_key, "test-key");
        assert_eq!(safe_browsing.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn postgres_requires_connection_fields() {
        let args = REQUIRED.into_iter().chain(["--storage", "postgres"]);
        assert!(CLI::try_parse_from(args).is_err());

        let args = REQUIRED.into_iter().chain([
            "--storage",
            "postgres",
            "--pg-host",
            "db.internal",
            "--pg-user",
            "fluster",
            "--pg-password",
            "secret",
            "--pg-db",
            "fluster",
            "--pg-ssl-mode",
            "disable",
        ]);
        let cli = CLI::try_parse_from(args).unwrap();
        assert_eq!(cli.storage, StorageBackendArg::Postgres);
        assert!(matches!(cli.pg_ssl_mode, PgSslMode::Disable));
        assert!(cli.postgres_settings().is_some());
    }

    #[test]
    fn overrides_outbound_settings() {
        let args = REQUIRED.into_iter().chain([
            "--max-redirects",
            "3",
            "--http-timeout-secs",
            "2",
            "--safe-browsing-endpoint",
            "http://127.0.0.1:9000",
        ]);
        let cli = CLI::try_parse_from(args).unwrap();

        assert_eq!(cli.resolver_settings().max_hops, 3);
        assert_eq!(
            cli.safe_browsing_settings().timeout,
            Duration::from_secs(2)
        );
        assert_eq!(
            cli.safe_browsing_settings().endpoint,
            "http://127.0.0.1:9000"
        );
    }
}
