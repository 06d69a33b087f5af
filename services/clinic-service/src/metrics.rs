use anyhow::Result;
use axum::response::Response;
use common_observability::ServiceMetrics;
use prometheus::{IntCounterVec, Opts};

pub const SERVICE_NAME: &str = "clinic-service";

#[derive(Clone)]
pub struct ClinicMetrics {
    service: ServiceMetrics,
    login_attempts: IntCounterVec,
}

impl ClinicMetrics {
    pub fn new() -> Result<Self> {
        let service = ServiceMetrics::new(SERVICE_NAME)?;

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "auth_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        service.registry().register(Box::new(login_attempts.clone()))?;

        Ok(Self {
            service,
            login_attempts,
        })
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn login_attempt_count(&self, outcome: &str) -> u64 {
        self.login_attempts.with_label_values(&[outcome]).get()
    }

    pub fn render(&self) -> Response {
        self.service.render_response()
    }
}
