use common_http_errors::{ApiError, ErrorBody};
use axum::body::to_bytes;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use uuid::Uuid;

async fn body_of(resp: axum::response::Response) -> ErrorBody {
    let bytes = to_bytes(resp.into_body(), 4096).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn unauthenticated_variant() {
    let err = ApiError::Unauthenticated { trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "unauthenticated");
}

#[test]
fn forbidden_variant() {
    let err = ApiError::Forbidden { trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "forbidden");
}

#[tokio::test]
async fn bad_request_variant_carries_message() {
    let err = ApiError::bad_request("missing_patientId", "patientId is required", None);
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_patientId");
    let body = body_of(resp).await;
    assert_eq!(body.code, "missing_patientId");
    assert_eq!(body.message.as_deref(), Some("patientId is required"));
}

#[test]
fn not_found_variant() {
    let err = ApiError::not_found("patient_not_found", None);
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "patient_not_found");
}

#[test]
fn conflict_variant() {
    let err = ApiError::Conflict { code: "email_taken", trace_id: None, message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "email_taken");
}

#[tokio::test]
async fn internal_variant_hides_detail() {
    let trace = Some(Uuid::new_v4());
    let err = ApiError::internal("connection refused to 10.0.0.5:5432", trace);
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
    let body = body_of(resp).await;
    assert_eq!(body.trace_id, trace);
    let message = body.message.unwrap_or_default();
    assert!(!message.contains("10.0.0.5"), "leaked detail: {message}");
}
