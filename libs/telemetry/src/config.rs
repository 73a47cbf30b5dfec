use std::env;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub json_logs: bool,
    /// Filter directive used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            json_logs: false,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    pub fn from_env(default_service_name: &str, default_service_version: &str) -> Self {
        let service_name =
            env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| default_service_name.to_string());
        let service_version = env::var("OTEL_SERVICE_VERSION")
            .unwrap_or_else(|_| default_service_version.to_string());
        let json_logs = env::var("LOG_FORMAT")
            .map(|v| parse_json_logs(&v))
            .unwrap_or(false);
        let default_filter = env::var("CHATWOOT_LOG_DEFAULT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self {
            service_name,
            service_version,
            json_logs,
            default_filter,
        }
    }
}

fn parse_json_logs(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "text" | "pretty" | "plain" | ""
    )
}
