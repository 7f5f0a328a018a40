//! Process-wide observability: the tracing subscriber and the optional
//! Prometheus metrics exporter, wired from the `[logging]` config section.

use crate::config::LoggingConfig;

/// Rendering for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unsupported logging.format {other:?} (expected \"text\" or \"json\")"
            )),
        }
    }
}

/// Install tracing and metrics for the whole process. The `HELIOS_LOG`
/// environment variable overrides the configured filter directives.
pub fn init(logging: &LoggingConfig) -> Result<(), String> {
    let directives = std::env::var("HELIOS_LOG").unwrap_or_else(|_| logging.level.clone());
    let filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .map_err(|err| format!("invalid log filter {directives:?}: {err}"))?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match LogFormat::parse(&logging.format)? {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    install_metrics_exporter(logging.metrics_addr.as_deref())
}

#[cfg(feature = "prometheus")]
fn install_metrics_exporter(addr: Option<&str>) -> Result<(), String> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let Some(raw) = addr else {
        return Ok(());
    };
    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid logging.metrics_addr (expected host:port): {err}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to start metrics exporter on {addr}: {err}"))?;
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

#[cfg(not(feature = "prometheus"))]
fn install_metrics_exporter(addr: Option<&str>) -> Result<(), String> {
    match addr {
        Some(_) => Err("logging.metrics_addr requires the `prometheus` feature".to_string()),
        None => Ok(()),
    }
}
