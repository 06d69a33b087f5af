use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated { trace_id: Option<Uuid>, message: Option<String> },
    Forbidden { trace_id: Option<Uuid>, message: Option<String> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Conflict { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    Internal { trace_id: Option<Uuid> },
}

impl ApiError {
    /// Logs the underlying failure and returns a response that carries no detail of it.
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self {
        tracing::error!(error = %e, trace_id = ?trace_id, "internal error");
        Self::Internal { trace_id }
    }
    pub fn bad_request(code: &'static str, message: impl Into<String>, trace_id: Option<Uuid>) -> Self {
        Self::BadRequest { code, trace_id, message: Some(message.into()) }
    }
    pub fn not_found(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::NotFound { code, trace_id } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, trace_id, message): (&str, Option<Uuid>, Option<String>) = match self {
            ApiError::Unauthenticated { trace_id, message } => ("unauthenticated", trace_id, message),
            ApiError::Forbidden { trace_id, message } => ("forbidden", trace_id, message),
            ApiError::BadRequest { code, trace_id, message } => (code, trace_id, message),
            ApiError::NotFound { code, trace_id } => (code, trace_id, None),
            ApiError::Conflict { code, trace_id, message } => (code, trace_id, message),
            ApiError::Internal { trace_id } => ("internal_error", trace_id, Some("Internal server error".into())),
        };
        let body = ErrorBody { code: code.to_string(), message, trace_id };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
