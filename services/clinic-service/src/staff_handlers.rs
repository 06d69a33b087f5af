//! Account management for center admins, doctors, receptionists, lab staff
//! and patient portal accounts.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use common_auth::Role;
use common_http_errors::{ApiError, ApiResult};
use common_security::{SecurityContext, SecurityCtxExtractor};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::identity::{
    hash_password, normalize_email, Identity, IdentityStatus, IdentityView, PasswordError,
};
use crate::record_handlers::{ensure_center_exists, ensure_patient_in_center, read_payload};
use crate::store::{Collection, DocumentQuery};
use crate::validation::{as_object, is_present, optional_id, required_id, ValidationError};
use crate::AppState;

#[derive(Clone)]
pub struct StaffState {
    pub app: AppState,
    pub role: Role,
}

impl StaffState {
    pub fn new(app: AppState, role: Role) -> Self {
        Self { app, role }
    }
}

fn not_found_code(role: Role) -> &'static str {
    match role {
        Role::SuperAdmin => "superadmin_not_found",
        Role::CenterAdmin => "centeradmin_not_found",
        Role::Doctor => "doctor_not_found",
        Role::Receptionist => "receptionist_not_found",
        Role::Lab => "lab_staff_not_found",
        Role::Patient => "patient_account_not_found",
    }
}

fn text_field(data: &Map<String, Value>, field: &'static str) -> Result<Option<String>, ValidationError> {
    if !is_present(data, field) {
        return Ok(None);
    }
    data.get(field)
        .and_then(Value::as_str)
        .map(|s| Some(s.trim().to_string()))
        .ok_or(ValidationError::InvalidValue(field))
}

fn status_field(data: &Map<String, Value>) -> Result<Option<IdentityStatus>, ValidationError> {
    if !is_present(data, "status") {
        return Ok(None);
    }
    data.get("status")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .map(Some)
        .ok_or(ValidationError::InvalidValue("status"))
}

fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidValue("email")),
    }
}

fn password_error(err: PasswordError, trace_id: Uuid) -> ApiError {
    match err {
        PasswordError::Empty => ValidationError::Missing("password").into_api_error(Some(trace_id)),
        other => ApiError::internal(other, Some(trace_id)),
    }
}

fn email_taken(trace_id: Uuid) -> ApiError {
    ApiError::Conflict {
        code: "email_taken",
        trace_id: Some(trace_id),
        message: Some("An account with this email already exists".into()),
    }
}

/// Role in the payload is accepted only when it matches the route's role.
fn check_role(data: &Map<String, Value>, role: Role) -> Result<(), ValidationError> {
    match data.get("role").and_then(Value::as_str) {
        Some(requested) if requested.parse::<Role>().ok() != Some(role) => {
            Err(ValidationError::ImmutableRole)
        }
        _ => Ok(()),
    }
}

async fn load_scoped(state: &StaffState, ctx: &SecurityContext, id: Uuid) -> ApiResult<Identity> {
    state
        .app
        .credentials
        .get(state.role, id)
        .await
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?
        .filter(|identity| match ctx.center_scope() {
            Some(center_id) => identity.center_id == Some(center_id),
            None => true,
        })
        .ok_or_else(|| ApiError::not_found(not_found_code(state.role), Some(ctx.trace_id)))
}

pub async fn create_staff(
    State(state): State<StaffState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IdentityView>)> {
    let trace_id = ctx.trace_id;
    let validation = |err: ValidationError| err.into_api_error(Some(trace_id));
    let data = as_object(read_payload(payload, trace_id)?).map_err(validation)?;

    check_role(&data, state.role).map_err(validation)?;
    let name = text_field(&data, "name")
        .and_then(|v| v.ok_or(ValidationError::Missing("name")))
        .map_err(validation)?;
    let email = text_field(&data, "email")
        .and_then(|v| v.ok_or(ValidationError::Missing("email")))
        .and_then(|v| validate_email(&v))
        .map_err(validation)?;
    let password = data
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if password.trim().is_empty() {
        return Err(validation(ValidationError::Missing("password")));
    }
    let status = status_field(&data).map_err(validation)?.unwrap_or_default();

    let center_id = if state.role.requires_center() {
        match ctx.center_scope() {
            Some(center_id) => Some(center_id),
            None => {
                let center_id = required_id(&data, "centerId").map_err(validation)?;
                ensure_center_exists(&state.app, center_id, trace_id).await?;
                Some(center_id)
            }
        }
    } else {
        None
    };

    let patient_id = if state.role == Role::Patient {
        let patient_id = required_id(&data, "patientId").map_err(validation)?;
        ensure_patient_in_center(&state.app, patient_id, center_id, trace_id).await?;
        Some(patient_id)
    } else {
        None
    };

    if state
        .app
        .credentials
        .email_taken(&email, None)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?
    {
        return Err(email_taken(trace_id));
    }

    let password_hash = hash_password(&password).map_err(|err| password_error(err, trace_id))?;

    let now = Utc::now();
    let identity = Identity {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash,
        role: state.role,
        center_id,
        patient_id,
        status,
        created_at: now,
        updated_at: now,
        updated_by: Some(ctx.subject),
    };

    state
        .app
        .credentials
        .insert(&identity)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;

    info!(role = %identity.role, id = %identity.id, actor = %ctx.subject, "account created");
    Ok((StatusCode::CREATED, Json(identity.view())))
}

pub async fn list_staff(
    State(state): State<StaffState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Query(filters): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<IdentityView>>> {
    let mut query = DocumentQuery::new().in_center(ctx.center_scope());
    let mut filters: Vec<(String, String)> = filters
        .into_iter()
        .filter(|(name, _)| name != "passwordHash")
        .collect();
    filters.sort();
    for (name, value) in filters {
        query = query.field_eq(name, value);
    }

    let identities = state
        .app
        .credentials
        .list(state.role, &query)
        .await
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?;
    Ok(Json(identities.iter().map(Identity::view).collect()))
}

pub async fn get_staff(
    State(state): State<StaffState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<IdentityView>> {
    let id = Uuid::parse_str(&raw_id)
        .map_err(|_| ApiError::not_found(not_found_code(state.role), Some(ctx.trace_id)))?;
    let identity = load_scoped(&state, &ctx, id).await?;
    Ok(Json(identity.view()))
}

/// Partial update of name, email, password and status.
pub async fn update_staff(
    State(state): State<StaffState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Path(raw_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<IdentityView>> {
    let trace_id = ctx.trace_id;
    let validation = |err: ValidationError| err.into_api_error(Some(trace_id));
    let id = Uuid::parse_str(&raw_id)
        .map_err(|_| ApiError::not_found(not_found_code(state.role), Some(trace_id)))?;
    let data = as_object(read_payload(payload, trace_id)?).map_err(validation)?;
    let mut identity = load_scoped(&state, &ctx, id).await?;

    check_role(&data, state.role).map_err(validation)?;

    if let Some(name) = text_field(&data, "name").map_err(validation)? {
        identity.name = name;
    }
    if let Some(email) = text_field(&data, "email").map_err(validation)? {
        let email = validate_email(&email).map_err(validation)?;
        if email != identity.email {
            if state
                .app
                .credentials
                .email_taken(&email, Some(identity.id))
                .await
                .map_err(|err| ApiError::internal(err, Some(trace_id)))?
            {
                return Err(email_taken(trace_id));
            }
            identity.email = email;
        }
    }
    if let Some(password) = data
        .get("password")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
    {
        identity.password_hash =
            hash_password(password).map_err(|err| password_error(err, trace_id))?;
    }
    if let Some(status) = status_field(&data).map_err(validation)? {
        identity.status = status;
    }
    if state.role == Role::Patient {
        if let Some(patient_id) = optional_id(&data, "patientId").map_err(validation)? {
            ensure_patient_in_center(&state.app, patient_id, identity.center_id, trace_id).await?;
            identity.patient_id = Some(patient_id);
        }
    }

    identity.updated_at = Utc::now();
    identity.updated_by = Some(ctx.subject);

    let replaced = state
        .app
        .credentials
        .replace(&identity)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    if !replaced {
        return Err(ApiError::not_found(not_found_code(state.role), Some(trace_id)));
    }

    info!(role = %identity.role, id = %identity.id, actor = %ctx.subject, "account updated");
    Ok(Json(identity.view()))
}

pub async fn delete_staff(
    State(state): State<StaffState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let trace_id = ctx.trace_id;
    let id = Uuid::parse_str(&raw_id)
        .map_err(|_| ApiError::not_found(not_found_code(state.role), Some(trace_id)))?;
    let identity = load_scoped(&state, &ctx, id).await?;

    let deleted = state
        .app
        .credentials
        .delete(state.role, identity.id)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    if !deleted {
        return Err(ApiError::not_found(not_found_code(state.role), Some(trace_id)));
    }

    info!(role = %state.role, %id, actor = %ctx.subject, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
