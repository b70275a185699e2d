//! Configuration defaults

pub const ENV_PREFIX: &str = "ROLLCALL";
pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

pub const DEFAULT_DB_URL: &str = "sqlite://rollcall.db?mode=rwc";

/// Upper bound for duration settings (10 years); larger values are ignored
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;
