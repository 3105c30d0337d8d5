//! Logging bootstrap.
//!
//! Structured tracing output: a human-readable console layer plus an
//! optional daily-rolling file layer. `RUST_LOG` takes precedence over the
//! configured default level.

use crate::config::LoggingConfig;
use crate::Result;
use anyhow::Context;
use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize tracing for a component.
///
/// `log_dir` is only used (and created) when file output is enabled.
pub fn init(component: &str, config: &LoggingConfig, log_dir: &Path) -> Result<()> {
    // Module-path targets use underscores even when the binary name does not.
    let target = component.replace('-', "_");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{target}={level},shared={level},hyper=warn,reqwest=warn,h2=warn",
            target = target,
            level = config.default_level
        ))
    });

    let mut layers = Vec::new();

    if config.console {
        // Results go to stdout as JSON, so logs keep to stderr.
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed();
        layers.push(console_layer);
    }

    if config.file {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
        let file_appender = tracing_appender::rolling::daily(log_dir, component);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_appender)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .boxed()
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(component = %component, "Logging initialized");

    Ok(())
}
