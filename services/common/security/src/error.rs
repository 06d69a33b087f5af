use common_auth::{AuthError, Role};
use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

use crate::policy::Capability;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("not authenticated: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("role '{role}' lacks capability {capability:?}")]
    Forbidden { capability: Capability, role: Role },
    #[error("internal security error: {0}")]
    Internal(String),
}

impl SecurityError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            SecurityError::Unauthenticated(AuthError::Signing(msg)) | SecurityError::Internal(msg) => {
                ApiError::internal(msg, trace_id)
            }
            SecurityError::Unauthenticated(err) => ApiError::Unauthenticated {
                trace_id,
                message: Some(err.to_string()),
            },
            SecurityError::Forbidden { capability, .. } => ApiError::Forbidden {
                trace_id,
                message: Some(format!(
                    "Insufficient role. Required one of: {}",
                    common_auth::join_roles(capability.allowed_roles())
                )),
            },
        }
    }
}

impl From<SecurityError> for ApiError {
    fn from(e: SecurityError) -> Self {
        e.into_api_error(None)
    }
}
