use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::FromRef;
use common_auth::{JwtVerifier, TokenSigner};

use crate::config::ServiceConfig;
use crate::identity::CredentialStore;
use crate::metrics::ClinicMetrics;
use crate::revocation::StoreRevocations;
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub credentials: CredentialStore,
    pub revocations: StoreRevocations,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub token_signer: Arc<TokenSigner>,
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<ClinicMetrics>,
}

impl AppState {
    pub fn new(config: ServiceConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let jwt_config = config.jwt_config();
        let secret = config.jwt_secret.as_bytes();
        let token_signer = TokenSigner::from_secret(jwt_config.clone(), secret)
            .context("Failed to initialise token signer")?;
        let jwt_verifier = JwtVerifier::from_secret(jwt_config, secret);
        let metrics = ClinicMetrics::new().context("Failed to register metrics")?;

        Ok(Self {
            credentials: CredentialStore::new(store.clone()),
            revocations: StoreRevocations::new(store.clone()),
            store,
            jwt_verifier: Arc::new(jwt_verifier),
            token_signer: Arc::new(token_signer),
            config: Arc::new(config),
            metrics: Arc::new(metrics),
        })
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }
}

impl FromRef<AppState> for Arc<ClinicMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
