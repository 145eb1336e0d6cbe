use std::{env, net::SocketAddr, sync::Arc};

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::config::hydrate_env_file;

/// Counter bumped by every vendor client bootstrap, labelled by `client`.
pub const CLIENTS_BUILT_METRIC: &str = "vendor_clients_built_total";
/// Counter of language-preference writes, labelled by `sink` and `result`.
pub const SINK_WRITES_METRIC: &str = "locale_sink_writes_total";
/// Counter of handled API requests, labelled by `endpoint`.
pub const API_REQUESTS_METRIC: &str = "api_requests_total";

const DEFAULT_LOG_FILTER: &str = "info";

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS_HANDLE: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();

/// Log filter and optional Prometheus listener for one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<String>,
}

impl TelemetryConfig {
    /// Reads `<PREFIX>_LOG_FILTER` and `<PREFIX>_METRICS_ADDRESS` after
    /// `.env` hydration. Both are optional.
    pub fn from_env(prefix: &str) -> Self {
        // A broken .env already fails Settings loading; don't fail twice.
        let _ = hydrate_env_file();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = prefix.trim().to_ascii_uppercase();
        let read = |suffix: &str| {
            lookup(&format!("{prefix}_{suffix}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            log_filter: read("LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            metrics_address: read("METRICS_ADDRESS"),
        }
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_address(&self) -> Option<&str> {
        self.metrics_address.as_deref()
    }
}

/// Handle to the process-wide Prometheus recorder.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: Arc<PrometheusHandle>,
}

impl TelemetryGuard {
    pub fn render_metrics(&self) -> String {
        self.metrics.render()
    }
}

/// Installs the tracing subscriber and the Prometheus recorder. Both are
/// process-wide, so repeated calls hand back the first installation.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    install_tracing(config)?;
    let metrics = install_metrics(config)?;

    Ok(TelemetryGuard { metrics })
}

fn install_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    if SUBSCRIBER_INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(config.log_filter())
        .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    if SUBSCRIBER_INSTALLED.set(()).is_ok() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))?;
    }

    Ok(())
}

fn install_metrics(config: &TelemetryConfig) -> Result<Arc<PrometheusHandle>, TelemetryError> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            let mut builder = PrometheusBuilder::new();
            if let Some(addr) = config.metrics_address() {
                builder = builder.with_http_listener(parse_listener(addr)?);
            }

            let handle = builder
                .install_recorder()
                .map_err(|err| TelemetryError::Metrics(err.to_string()))?;
            describe_metrics();
            Ok(Arc::new(handle))
        })
        .cloned()
}

fn parse_listener(addr: &str) -> Result<SocketAddr, TelemetryError> {
    addr.parse::<SocketAddr>().map_err(|err| {
        TelemetryError::InvalidMetricsAddress(addr.to_string(), err.to_string())
    })
}

fn describe_metrics() {
    describe_counter!(CLIENTS_BUILT_METRIC, "Vendor clients constructed at startup.");
    describe_counter!(SINK_WRITES_METRIC, "Language preference writes per sink and result.");
    describe_counter!(API_REQUESTS_METRIC, "HTTP requests handled per endpoint.");
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{0}`: {1}")]
    InvalidMetricsAddress(String, String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn config(vars: &[(&str, &str)]) -> TelemetryConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        TelemetryConfig::from_lookup("api", |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_variables() {
        let cfg = config(&[]);
        assert_eq!(cfg.log_filter(), "info");
        assert_eq!(cfg.metrics_address(), None);
    }

    #[test]
    fn prefixed_variables_are_trimmed() {
        let cfg = config(&[
            ("API_LOG_FILTER", " credit_desk=debug "),
            ("API_METRICS_ADDRESS", "127.0.0.1:9898"),
            ("LOG_FILTER", "trace"),
        ]);
        assert_eq!(cfg.log_filter(), "credit_desk=debug");
        assert_eq!(cfg.metrics_address(), Some("127.0.0.1:9898"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("API_LOG_FILTER", "  "), ("API_METRICS_ADDRESS", "")]);
        assert_eq!(cfg, config(&[]));
    }

    #[test]
    fn listener_address_must_be_a_socket() {
        assert!(parse_listener("0.0.0.0:9100").is_ok());
        assert!(matches!(
            parse_listener("localhost"),
            Err(TelemetryError::InvalidMetricsAddress(addr, _)) if addr == "localhost"
        ));
    }

    #[test]
    fn from_env_reads_process_variables() {
        let _guard = ENV_GUARD.lock().unwrap();
        env::set_var("CREDIT_DESK_SKIP_DOTENV", "1");
        env::set_var("TELEMETRY_TEST_LOG_FILTER", "warn");

        let cfg = TelemetryConfig::from_env("telemetry_test");
        assert_eq!(cfg.log_filter(), "warn");
        assert_eq!(cfg.metrics_address(), None);

        env::remove_var("TELEMETRY_TEST_LOG_FILTER");
    }
}
