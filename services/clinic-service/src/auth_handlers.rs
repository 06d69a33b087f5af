use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common_auth::TokenSubject;
use common_http_errors::{ApiError, ApiResult};
use common_security::SecurityCtxExtractor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::identity::{verify_password, verify_unknown_account, IdentitySummary};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
    pub user: IdentitySummary,
}

fn invalid_credentials(trace_id: Uuid) -> ApiError {
    ApiError::Unauthenticated {
        trace_id: Some(trace_id),
        message: Some("Invalid credentials. Please try again.".into()),
    }
}

pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let trace_id = Uuid::new_v4();
    let Json(LoginRequest { email, password }) = payload.map_err(|err| {
        ApiError::bad_request("invalid_payload", err.body_text(), Some(trace_id))
    })?;

    if email.trim().is_empty() {
        return Err(ApiError::bad_request("missing_email", "email is required", Some(trace_id)));
    }
    if password.is_empty() {
        return Err(ApiError::bad_request(
            "missing_password",
            "password is required",
            Some(trace_id),
        ));
    }

    let identity = state
        .credentials
        .find_by_email(&email)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;

    let Some(identity) = identity else {
        verify_unknown_account(&password);
        state.record_login_metric("unknown_user");
        warn!(%trace_id, "login rejected: unknown email");
        return Err(invalid_credentials(trace_id));
    };

    if !verify_password(&password, &identity.password_hash) {
        state.record_login_metric("invalid_credentials");
        warn!(%trace_id, user_id = %identity.id, "login rejected: bad password");
        return Err(invalid_credentials(trace_id));
    }

    if !identity.is_active() {
        state.record_login_metric("inactive");
        warn!(%trace_id, user_id = %identity.id, "login rejected: account inactive");
        return Err(invalid_credentials(trace_id));
    }

    let issued = state
        .token_signer
        .issue(&TokenSubject {
            user_id: identity.id,
            role: identity.role,
            center_id: identity.center_id,
        })
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;

    state.record_login_metric("success");
    info!(user_id = %identity.id, role = %identity.role, "login succeeded");

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: issued.token_type.to_string(),
        expires_at: issued.expires_at,
        expires_in: issued.expires_in,
        user: identity.summary(),
    }))
}

/// Profile of the signed-in user, looked up fresh so renamed or
/// deactivated accounts are reflected.
pub async fn current_user(
    State(state): State<AppState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
) -> ApiResult<Json<IdentitySummary>> {
    let identity = state
        .credentials
        .get(ctx.role, ctx.subject)
        .await
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?;

    match identity {
        Some(identity) if identity.is_active() => Ok(Json(identity.summary())),
        _ => Err(ApiError::Unauthenticated {
            trace_id: Some(ctx.trace_id),
            message: Some("account no longer exists".into()),
        }),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
) -> ApiResult<StatusCode> {
    state
        .revocations
        .revoke(ctx.token_id, ctx.token_expires_at)
        .await
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?;
    info!(user_id = %ctx.subject, token_id = %ctx.token_id, "token revoked");
    Ok(StatusCode::NO_CONTENT)
}
