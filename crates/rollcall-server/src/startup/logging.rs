//! File-based logging.
//!
//! Every event goes to the console and to the root `rollcall.log`. Components
//! additionally get their own daily-rotated file, routed by tracing target:
//!
//! | Log File          | Component                 | Target Prefixes                                                   |
//! |-------------------|---------------------------|-------------------------------------------------------------------|
//! | rollcall.log      | Root logger (all events)  | (all)                                                             |
//! | registry.log      | Announce, probes, sweeper | rollcall_registry                                                 |
//! | persistence.log   | Node store                | rollcall_persistence, rollcall_migration, sea_orm                 |
//! | http.log          | HTTP surface              | rollcall_server::api, rollcall_server::middleware, actix_web      |
//!
//! Log files are stored in `~/rollcall/logs` by default.
//! Override with the `logs.path` config key.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const ROOT_LOG_FILE: &str = "rollcall.log";

/// Internal definition for a component log file.
struct ComponentLogDef {
    file_name: &'static str,
    /// Target module prefixes routed to this file
    targets: &'static [&'static str],
}

const COMPONENT_LOGS: &[ComponentLogDef] = &[
    ComponentLogDef {
        file_name: "registry.log",
        targets: &["rollcall_registry"],
    },
    ComponentLogDef {
        file_name: "persistence.log",
        targets: &["rollcall_persistence", "rollcall_migration", "sea_orm"],
    },
    ComponentLogDef {
        file_name: "http.log",
        targets: &[
            "rollcall_server::api",
            "rollcall_server::middleware",
            "actix_web",
        ],
    },
];

/// Log rotation policy
#[derive(Debug, Clone, Copy)]
pub enum LogRotation {
    Daily,
    Hourly,
    /// Never rotate (single file)
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Logging configuration for the entire application.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log directory (default: `~/rollcall/logs`)
    pub log_dir: PathBuf,
    pub console_output: bool,
    pub console_level: Level,
    pub file_logging: bool,
    pub file_level: Level,
    pub rotation: LogRotation,
}

fn default_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{}/rollcall/logs", home))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            console_output: true,
            console_level: Level::INFO,
            file_logging: true,
            file_level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Create from application configuration.
    ///
    /// `~` at the start of `log_dir` expands to `$HOME`. Unknown levels fall back to INFO.
    pub fn from_config(
        log_dir: Option<String>,
        console_output: bool,
        file_logging: bool,
        level: String,
    ) -> Self {
        let log_dir = log_dir
            .map(|dir| match dir.strip_prefix("~/") {
                Some(rest) => {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                    PathBuf::from(home).join(rest)
                }
                None => PathBuf::from(dir),
            })
            .unwrap_or_else(default_log_dir);

        let level = level.parse().unwrap_or(Level::INFO);

        Self {
            log_dir,
            console_output,
            console_level: level,
            file_logging,
            file_level: level,
            rotation: LogRotation::Daily,
        }
    }
}

/// Guard that keeps the logging system alive.
///
/// Must be kept alive for the duration of the application. When dropped,
/// all buffered log output is flushed.
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}

fn file_layer(
    config: &LoggingConfig,
    file_name: &str,
    guards: &mut Vec<WorkerGuard>,
) -> impl Layer<Registry> + Send + Sync + 'static {
    let appender = RollingFileAppender::new(config.rotation.into(), &config.log_dir, file_name);
    let (nb, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);

    fmt::layer()
        .with_writer(nb)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
}

/// Initialize the logging system with multi-file output.
///
/// This sets up:
/// - Console output (optional, `RUST_LOG` overrides the configured level)
/// - Root log file `rollcall.log` that captures all events
/// - Component-specific log files with target-based routing
///
/// Returns a [`LoggingGuard`] that must be kept alive for the duration of the application.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;
    }

    let mut guards: Vec<WorkerGuard> = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.console_level.to_string()));
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter);
        layers.push(Box::new(console_layer));
    }

    if config.file_logging {
        let root_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.file_level.to_string()));
        let root_layer = file_layer(config, ROOT_LOG_FILE, &mut guards).with_filter(root_filter);
        layers.push(Box::new(root_layer));

        for component in COMPONENT_LOGS {
            let level: LevelFilter = config.file_level.into();
            let targets = component
                .targets
                .iter()
                .fold(Targets::new(), |targets, target| targets.with_target(*target, level));

            let layer = file_layer(config, component.file_name, &mut guards).with_filter(targets);
            layers.push(Box::new(layer));
        }
    }

    // All filtering is per-layer (no global EnvFilter)
    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    if config.file_logging {
        tracing::info!(
            log_dir = %config.log_dir.display(),
            "File logging initialized: {} (root) + {} component log files",
            ROOT_LOG_FILE,
            COMPONENT_LOGS.len()
        );
    }

    Ok(LoggingGuard {
        _file_guards: guards,
    })
}
