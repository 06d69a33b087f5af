use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

/// Distinct `code` label values kept before folding the rest into `overflow`.
pub const MAX_ERROR_CODES: usize = 40;
const OVERFLOW_CODE: &str = "overflow";

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Clone)]
pub struct ServiceMetrics {
    service: &'static str,
    registry: Registry,
    http_errors_total: IntCounterVec,
    seen_codes: Arc<Mutex<HashSet<String>>>,
}

impl ServiceMetrics {
    pub fn new(service: &'static str) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)",
            ),
            &["service", "code", "status"],
        )?;
        registry.register(Box::new(http_errors_total.clone()))?;
        Ok(Self {
            service,
            registry,
            http_errors_total,
            seen_codes: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Registry shared with service-specific collectors.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_http_error(&self, code: &str, status: StatusCode) {
        let label = self.bounded_code(code);
        self.http_errors_total
            .with_label_values(&[self.service, &label, status.as_str()])
            .inc();
    }

    pub fn http_error_count(&self, code: &str, status: StatusCode) -> u64 {
        self.http_errors_total
            .with_label_values(&[self.service, code, status.as_str()])
            .get()
    }

    fn bounded_code(&self, code: &str) -> String {
        let mut seen = match self.seen_codes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seen.contains(code) {
            return code.to_string();
        }
        if seen.len() >= MAX_ERROR_CODES {
            return OVERFLOW_CODE.to_string();
        }
        seen.insert(code.to_string());
        code.to_string()
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    pub fn render_response(&self) -> Response {
        match self.render() {
            Ok(body) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                )],
                body,
            )
                .into_response(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to render metrics");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Counts every response with status >= 400, labelled by its `X-Error-Code`.
pub async fn track_http_errors(
    State(metrics): State<ServiceMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("X-Error-Code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics.record_http_error(code, status);
    }
    resp
}
