use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GatewaySettings;

/// Initialize console-friendly logging for development
pub fn init_console_tracing() -> Result<()> {
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .wrap_err("Failed to install console tracing subscriber")?;

    tracing::info!("kroute console logging initialized");
    Ok(())
}

/// Initialize tracing from the level and format in `settings`.
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init_tracing_with_settings(settings: &GatewaySettings) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .wrap_err_with(|| format!("Invalid log level: {}", settings.log_level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let installed = if settings.json_logs {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.json().with_current_span(true).with_span_list(true))
            .try_init()
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.pretty().with_ansi(true))
            .try_init()
    };
    installed.wrap_err("Failed to install tracing subscriber")?;

    tracing::debug!(
        level = %settings.log_level,
        json = settings.json_logs,
        "kroute logging initialized"
    );
    Ok(())
}

/// Span covering the resolution of one inbound request.
pub fn create_request_span(method: &str, path: &str, host: &str) -> tracing::Span {
    tracing::debug_span!(
        "request",
        http.method = method,
        http.path = path,
        http.host = host,
        decision = tracing::field::Empty,
    )
}

/// Span covering the application of one resource event.
pub fn create_resource_span(action: &str, kind: &str, namespace: &str, name: &str) -> tracing::Span {
    tracing::info_span!(
        "resource_event",
        action = action,
        resource.kind = kind,
        resource.namespace = namespace,
        resource.name = name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_with_settings_rejects_bad_level() {
        let settings = GatewaySettings {
            log_level: "kroute=notalevel".to_string(),
            ..Default::default()
        };
        // Only meaningful when RUST_LOG is not set in the test environment.
        if std::env::var("RUST_LOG").is_err() {
            assert!(init_tracing_with_settings(&settings).is_err());
        }
    }

    #[test]
    fn test_create_request_span() {
        let span = create_request_span("GET", "/api/test", "api.example.com");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "request");
        }
    }

    #[test]
    fn test_create_resource_span() {
        let span = create_resource_span("added", "route", "default", "api");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "resource_event");
        }
    }
}
