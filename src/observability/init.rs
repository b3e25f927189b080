//! Tracing subscriber setup.

use super::tracer;
use crate::infrastructure::paths;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// Filter resolution: `RUST_LOG` if set, else `config.trace_level`, else
/// `info`. Human-readable events go to stderr. When `config.trace_file` is set,
/// spans are additionally exported as JSON lines to that file (a leading `~`
/// is expanded).
///
/// Safe to call more than once; only the first call takes effect. A trace
/// file that cannot be prepared disables file export but keeps stderr logging.
///
/// # Example
///
/// ```rust
/// use feedsync::observability::init_tracing;
/// use feedsync::Config;
///
/// let config = Config {
///     trace_level: Some("debug".to_string()),
///     ..Default::default()
/// };
/// init_tracing(&config);
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let level = config.trace_level.clone().unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let otel_layer = config.trace_file.as_deref().and_then(|trace_file| {
        let path = paths::expand_tilde(trace_file);
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("feedsync: trace export disabled, cannot create {}: {e}", parent.display());
                return None;
            }
        }

        let resource = Resource::new(vec![opentelemetry::KeyValue::new("service.name", "feedsync")]);
        let provider = tracer::create_tracer_provider(path, resource);
        Some(OpenTelemetryLayer::new(provider.tracer("feedsync")))
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer);

    let _ = subscriber.try_init();
}
