//! Tracing subscriber setup for the fieldgate binary.
//!
//! Everything is read from the environment:
//!
//! | variable       | values                          | default                      |
//! |----------------|---------------------------------|------------------------------|
//! | `ENVIRONMENT`  | any, `prod`/`production` matter | `development`                |
//! | `LOG_FORMAT`   | `json`, `pretty`                | json in production           |
//! | `LOG_OUTPUT`   | `stdout`, `stderr`, `file`      | `stderr`                     |
//! | `LOG_DIR`      | directory for `file` output     | `logs`                       |
//! | `LOG_ROTATION` | `daily`, `hourly`, `never`      | `daily`                      |
//!
//! `RUST_LOG` overrides the level filter.

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Log files are named `fieldgate.<date>` inside the log directory.
const LOG_FILE_PREFIX: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File { dir: PathBuf, rotation: Rotation },
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Daily,
    Hourly,
    Never,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

impl Rotation {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "hourly" => Some(Self::Hourly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source. Unknown values fall back
    /// to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let default_format = if is_production(&environment) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        let format = lookup("LOG_FORMAT")
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(default_format);

        let output = match lookup("LOG_OUTPUT").map(|raw| raw.to_ascii_lowercase()) {
            Some(raw) if raw == "stdout" => LogOutput::Stdout,
            Some(raw) if raw == "file" => LogOutput::File {
                dir: lookup("LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from),
                rotation: lookup("LOG_ROTATION")
                    .and_then(|raw| Rotation::parse(&raw))
                    .unwrap_or(Rotation::Daily),
            },
            _ => LogOutput::Stderr,
        };

        Self {
            format,
            output,
            environment,
        }
    }

    fn default_directive(&self) -> &'static str {
        if is_production(&self.environment) {
            "info,hyper=info,tower=info"
        } else {
            "debug,hyper=info,tower=info"
        }
    }
}

fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Installs the global subscriber.
///
/// The returned guard flushes the non-blocking writer on drop and must be
/// held until the process exits.
pub fn init_logging(config: LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
        LogOutput::File { dir, rotation } => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {:?}", dir))?;
            let appender = match rotation {
                Rotation::Daily => rolling::daily(dir, LOG_FILE_PREFIX),
                Rotation::Hourly => rolling::hourly(dir, LOG_FILE_PREFIX),
                Rotation::Never => rolling::never(dir, LOG_FILE_PREFIX),
            };
            tracing_appender::non_blocking(appender)
        }
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_thread_ids(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        "logging initialized"
    );

    Ok(guard)
}

/// Span wrapping the handling of one request on a configured route.
pub fn endpoint_span(path: &str, method: &str) -> tracing::Span {
    tracing::info_span!(
        "endpoint",
        http.route = path,
        http.method = method,
        service = env!("CARGO_PKG_NAME"),
    )
}
