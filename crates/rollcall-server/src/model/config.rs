//! Configuration management for the Rollcall server
//!
//! Sources, lowest precedence first:
//! - `conf/application.yml` (or the file given with `--config`), optional
//! - `ROLLCALL__*` environment variables (`ROLLCALL__SERVER__PORT=9000`)
//! - command line flags

use std::ffi::OsString;
use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;
use config::{Config, Environment};
use rollcall_persistence::StorageMode;
use rollcall_registry::{ProbeConfig, SweeperConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::middleware::rate_limit::RateLimitConfig;
use crate::startup::LoggingConfig;

use super::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_DB_URL, DEFAULT_SERVER_ADDRESS, DEFAULT_SERVER_PORT, ENV_PREFIX,
    MAX_DURATION_SECS,
};

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(version, about = "Public registry of self-reporting nodes")]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<String>,
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

/// Application configuration loaded from config files, environment and CLI
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration using the process arguments
    pub fn new() -> anyhow::Result<Self> {
        Self::build(Cli::parse())
    }

    /// Load configuration from an explicit argument list
    pub fn from_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::build(Cli::try_parse_from(args)?)
    }

    fn build(args: Cli) -> anyhow::Result<Self> {
        let config_file = args
            .config
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&config_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = args.port {
            config_builder = config_builder.set_override("server.port", v)?;
        }
        if let Some(v) = args.database_url {
            config_builder = config_builder.set_override("db.url", v)?;
        }
        if let Some(v) = args.log_level {
            config_builder = config_builder.set_override("logs.level", v)?;
        }

        Ok(Configuration {
            config: config_builder.build()?,
        })
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("server.address")
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int("server.port")
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    // ========================================================================
    // Persistence Configuration
    // ========================================================================

    pub fn persistence_mode(&self) -> StorageMode {
        self.config
            .get_string("persistence.mode")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn database_url(&self) -> String {
        self.config
            .get_string("db.url")
            .unwrap_or(DEFAULT_DB_URL.to_string())
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let max_connections = self.config.get_int("db.max_connections").unwrap_or(10) as u32;
        let connect_timeout = self.config.get_int("db.connect_timeout_secs").unwrap_or(30) as u64;
        let sqlx_logging = self.config.get_bool("db.sqlx_logging").unwrap_or(false);

        let mut opt = ConnectOptions::new(self.database_url());
        opt.max_connections(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .sqlx_logging(sqlx_logging);

        tracing::info!(
            max_connections = max_connections,
            connect_timeout = connect_timeout,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        Ok(Database::connect(opt).await?)
    }

    // ========================================================================
    // Probe & Sweeper Configuration
    // ========================================================================

    /// Seconds under `key`, ignoring zero and anything above [`MAX_DURATION_SECS`]
    fn duration_secs(&self, key: &str) -> Option<Duration> {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| (1..=MAX_DURATION_SECS).contains(v))
            .map(Duration::from_secs)
    }

    pub fn probe_config(&self) -> ProbeConfig {
        let defaults = ProbeConfig::default();
        ProbeConfig {
            timeout: self
                .duration_secs("probe.timeout_secs")
                .unwrap_or(defaults.timeout),
            user_agent: self
                .config
                .get_string("probe.user_agent")
                .unwrap_or(defaults.user_agent),
        }
    }

    pub fn sweeper_enabled(&self) -> bool {
        self.config.get_bool("sweeper.enabled").unwrap_or(true)
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        let defaults = SweeperConfig::default();

        // Zero is a valid initial delay
        let initial_delay = match self.config.get_int("sweeper.initial_delay_secs") {
            Ok(0) => Some(Duration::ZERO),
            _ => self.duration_secs("sweeper.initial_delay_secs"),
        };

        SweeperConfig {
            interval: self
                .duration_secs("sweeper.interval_secs")
                .unwrap_or(defaults.interval),
            initial_delay: initial_delay.unwrap_or(defaults.initial_delay),
            eviction_after: self
                .config
                .get_int("sweeper.eviction_hours")
                .ok()
                .filter(|h| (1..=MAX_DURATION_SECS as i64 / 3600).contains(h))
                .and_then(TimeDelta::try_hours)
                .unwrap_or(defaults.eviction_after),
            concurrency: self
                .config
                .get_int("sweeper.concurrency")
                .ok()
                .and_then(|v| usize::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.concurrency),
        }
    }

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        let defaults = RateLimitConfig::default();
        RateLimitConfig {
            max_requests: self
                .config
                .get_int("rate_limit.max_requests")
                .ok()
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_requests),
            window_duration: self
                .config
                .get_int("rate_limit.window_secs")
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.window_duration),
            enabled: self
                .config
                .get_bool("rate_limit.enabled")
                .unwrap_or(defaults.enabled),
        }
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("logs.path").ok(),
            self.config.get_bool("logs.console").unwrap_or(true),
            self.config.get_bool("logs.file").unwrap_or(true),
            self.config
                .get_string("logs.level")
                .unwrap_or("info".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let configuration =
            Configuration::from_args(["rollcall-server", "--config", "/nonexistent/rollcall"])
                .unwrap();

        assert_eq!(configuration.server_address(), "0.0.0.0");
        assert_eq!(configuration.persistence_mode(), StorageMode::Sql);
        assert!(configuration.sweeper_enabled());

        let sweeper = configuration.sweeper_config();
        assert_eq!(sweeper.interval, Duration::from_secs(300));
        assert_eq!(sweeper.initial_delay, Duration::from_secs(10));
        assert_eq!(sweeper.eviction_after, TimeDelta::hours(48));
        assert_eq!(sweeper.concurrency, 16);

        assert_eq!(configuration.probe_config().timeout, Duration::from_secs(8));
        assert_eq!(configuration.rate_limit_config().max_requests, 120);
    }

    #[test]
    fn test_file_values_and_cli_overrides() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 7000\npersistence:\n  mode: memory\nsweeper:\n  interval_secs: 60\n  concurrency: 4\nlogs:\n  level: warn"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let configuration =
            Configuration::from_args(["rollcall-server", "--config", &path, "--port", "7100"])
                .unwrap();

        assert_eq!(configuration.server_port(), 7100);
        assert_eq!(configuration.persistence_mode(), StorageMode::Memory);
        assert_eq!(configuration.sweeper_config().interval, Duration::from_secs(60));
        assert_eq!(configuration.sweeper_config().concurrency, 4);
        assert_eq!(
            configuration.logging_config().console_level,
            tracing::Level::WARN
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 700000\nsweeper:\n  concurrency: 0\n  eviction_hours: -1"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let configuration = Configuration::from_args(["rollcall-server", "--config", &path]).unwrap();
        assert_eq!(configuration.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(configuration.sweeper_config().concurrency, 16);
        assert_eq!(configuration.sweeper_config().eviction_after, TimeDelta::hours(48));
    }

    #[test]
    fn test_out_of_range_durations_fall_back() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "probe:\n  timeout_secs: 0\nsweeper:\n  eviction_hours: 9000000000000000\n  interval_secs: 9000000000000000\n  initial_delay_secs: 0"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let configuration = Configuration::from_args(["rollcall-server", "--config", &path]).unwrap();
        assert_eq!(configuration.probe_config().timeout, Duration::from_secs(8));

        let sweeper = configuration.sweeper_config();
        assert_eq!(sweeper.eviction_after, TimeDelta::hours(48));
        assert_eq!(sweeper.interval, Duration::from_secs(300));
        assert_eq!(sweeper.initial_delay, Duration::ZERO);
    }
}
