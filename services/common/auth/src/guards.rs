use axum::http::StatusCode;

use crate::claims::Claims;
use crate::roles::{join_roles, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    Forbidden { required: Vec<Role> },
}

impl GuardError {
    pub fn status(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    pub fn message(&self) -> String {
        match self {
            GuardError::Forbidden { required } => {
                if required.is_empty() {
                    "Insufficient role".to_string()
                } else {
                    format!("Insufficient role. Required one of: {}", join_roles(required))
                }
            }
        }
    }
}

/// Exact set-membership test of the caller's role against an allow-list.
/// An empty allow-list admits nobody.
pub fn ensure_role(claims: &Claims, allowed: &[Role]) -> Result<(), GuardError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(GuardError::Forbidden {
            required: allowed.to_vec(),
        })
    }
}
