use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use chrono::{DateTime, Utc};
use common_auth::{Claims, Role};
use common_http_errors::ApiError;
use serde::Serialize;
use uuid::Uuid;

/// Identity resolved by the access policy and attached to the request.
/// Controllers read the actor from here, never from the payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityContext {
    pub subject: Uuid,
    pub role: Role,
    pub center_id: Option<Uuid>,
    pub token_id: Uuid,
    pub token_expires_at: DateTime<Utc>,
    pub trace_id: Uuid,
}

impl SecurityContext {
    pub fn from_claims(claims: &Claims, trace_id: Uuid) -> Self {
        Self {
            subject: claims.subject,
            role: claims.role,
            center_id: claims.center_id,
            token_id: claims.token_id,
            token_expires_at: claims.expires_at,
            trace_id,
        }
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Center every read and write must be restricted to; `None` means all centers.
    pub fn center_scope(&self) -> Option<Uuid> {
        if self.is_superadmin() {
            None
        } else {
            self.center_id
        }
    }
}

pub(crate) fn trace_id_from_headers(headers: &HeaderMap) -> Uuid {
    headers
        .get("X-Trace-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4)
}

pub struct SecurityCtxExtractor(pub SecurityContext);

#[async_trait]
impl<S> FromRequestParts<S> for SecurityCtxExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(SecurityCtxExtractor)
            .ok_or_else(|| ApiError::Unauthenticated {
                trace_id: None,
                message: Some("request was not authenticated".into()),
            })
    }
}
