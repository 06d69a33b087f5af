use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common_auth::{ensure_role, AuthContext, AuthError, JwtVerifier};
use tracing::{warn, Span};
use uuid::Uuid;

use crate::context::trace_id_from_headers;
use crate::policy::Capability;
use crate::{SecurityContext, SecurityError};

/// Lookup of token ids invalidated before their natural expiry.
#[async_trait]
pub trait RevocationList: Send + Sync {
    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, SecurityError>;
}

/// Per-route access rule: reads (GET/HEAD/OPTIONS) need `read`, everything
/// else needs `write`.
#[derive(Clone)]
pub struct AccessPolicy {
    verifier: Arc<JwtVerifier>,
    revocations: Option<Arc<dyn RevocationList>>,
    read: Capability,
    write: Capability,
}

impl AccessPolicy {
    pub fn new(verifier: Arc<JwtVerifier>, capability: Capability) -> Self {
        Self {
            verifier,
            revocations: None,
            read: capability,
            write: capability,
        }
    }

    pub fn with_write(mut self, capability: Capability) -> Self {
        self.write = capability;
        self
    }

    pub fn with_revocations(mut self, revocations: Arc<dyn RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    pub fn capability_for(&self, method: &Method) -> Capability {
        if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
            self.read
        } else {
            self.write
        }
    }

    /// Authenticates first, then checks the revocation list, then the role.
    pub async fn authorize(
        &self,
        method: &Method,
        headers: &HeaderMap,
        trace_id: Uuid,
    ) -> Result<SecurityContext, SecurityError> {
        let auth = AuthContext::from_headers(headers, &self.verifier)?;
        let claims = auth.into_claims();

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(claims.token_id).await? {
                return Err(SecurityError::Unauthenticated(AuthError::Revoked));
            }
        }

        let capability = self.capability_for(method);
        if ensure_role(&claims, capability.allowed_roles()).is_err() {
            return Err(SecurityError::Forbidden {
                capability,
                role: claims.role,
            });
        }

        Ok(SecurityContext::from_claims(&claims, trace_id))
    }
}

/// Route-layer middleware: rejects with 401/403 before the handler runs, or
/// attaches the `SecurityContext` to the request extensions.
pub async fn enforce_access(
    State(policy): State<AccessPolicy>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = trace_id_from_headers(req.headers());
    match policy.authorize(req.method(), req.headers(), trace_id).await {
        Ok(ctx) => {
            Span::current().record("user_id", tracing::field::display(ctx.subject));
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(err) => {
            warn!(
                method = %req.method(),
                path = %req.uri().path(),
                %trace_id,
                error = %err,
                "access denied"
            );
            err.into_api_error(Some(trace_id)).into_response()
        }
    }
}
