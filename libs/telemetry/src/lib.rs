//! Tracing setup and span helpers for the Chatwoot widget bridge.

use anyhow::Result;

mod config;
mod spans;
mod tracing_init;

pub use config::TelemetryConfig;
pub use spans::{span_for_command, span_for_event, span_for_instance};
pub use tracing_init::{init_tracing, tracing_initialised};

/// Installs the shared subscriber configured from `RUST_LOG` and `LOG_FORMAT`.
pub fn install(service_name: &str, service_version: &str) -> Result<()> {
    init_tracing(&TelemetryConfig::from_env(service_name, service_version))
}
