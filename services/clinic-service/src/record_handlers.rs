//! Generic controllers shared by centers, patients, follow-ups,
//! prescriptions and visit history.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use common_http_errors::{ApiError, ApiResult};
use common_security::{SecurityContext, SecurityCtxExtractor};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::records::{prepare_payload, DependentLink, Record, RecordPayload, ResourceKind};
use crate::store::{Collection, DocumentQuery, StoreResult};
use crate::validation::ValidationError;
use crate::AppState;

/// Router state for one resource kind.
#[derive(Clone)]
pub struct ResourceState {
    pub app: AppState,
    pub kind: ResourceKind,
}

impl ResourceState {
    pub fn new(app: AppState, kind: ResourceKind) -> Self {
        Self { app, kind }
    }
}

pub(crate) fn read_payload(
    payload: Result<Json<Value>, JsonRejection>,
    trace_id: Uuid,
) -> ApiResult<Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|err| ApiError::bad_request("invalid_payload", err.body_text(), Some(trace_id)))
}

/// A superadmin-supplied center must refer to an existing center.
pub(crate) async fn ensure_center_exists(
    app: &AppState,
    center_id: Uuid,
    trace_id: Uuid,
) -> ApiResult<()> {
    let center = app
        .store
        .get(Collection::Centers, center_id)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    if center.is_some() {
        Ok(())
    } else {
        Err(ValidationError::InvalidReference("centerId").into_api_error(Some(trace_id)))
    }
}

/// A patient reference must name a patient of the same center.
pub(crate) async fn ensure_patient_in_center(
    app: &AppState,
    patient_id: Uuid,
    center_id: Option<Uuid>,
    trace_id: Uuid,
) -> ApiResult<()> {
    let patient = app
        .store
        .get(Collection::Patients, patient_id)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    match patient {
        Some(doc) if doc.center_id == center_id => Ok(()),
        _ => Err(ValidationError::InvalidReference("patientId").into_api_error(Some(trace_id))),
    }
}

async fn check_references(
    state: &ResourceState,
    payload: &RecordPayload,
    center_id: Option<Uuid>,
    trace_id: Uuid,
) -> ApiResult<()> {
    for field in state.kind.reference_fields() {
        let patient_id = payload
            .data
            .get(*field)
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| {
                ValidationError::InvalidReference(*field).into_api_error(Some(trace_id))
            })?;
        ensure_patient_in_center(&state.app, patient_id, center_id, trace_id).await?;
    }
    Ok(())
}

fn parse_id(raw: &str, code: &'static str, trace_id: Uuid) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(code, Some(trace_id)))
}

/// Superadmins choose the center in the payload; everyone else is pinned to
/// the center in their token.
fn owning_center(
    kind: ResourceKind,
    ctx: &SecurityContext,
    payload: &RecordPayload,
) -> Result<Option<Uuid>, ValidationError> {
    if !kind.center_scoped() {
        return Ok(None);
    }
    match ctx.center_scope() {
        Some(center_id) => Ok(Some(center_id)),
        None => payload
            .requested_center
            .map(Some)
            .ok_or(ValidationError::Missing("centerId")),
    }
}

async fn load_scoped(state: &ResourceState, ctx: &SecurityContext, id: Uuid) -> ApiResult<Record> {
    let kind = state.kind;
    let doc = state
        .app
        .store
        .get(kind.collection(), id)
        .await
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?
        .filter(|doc| match ctx.center_scope() {
            Some(center_id) if kind.center_scoped() => doc.center_id == Some(center_id),
            _ => true,
        })
        .ok_or_else(|| ApiError::not_found(kind.not_found_code(), Some(ctx.trace_id)))?;

    Record::from_document(doc).map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))
}

async fn has_dependents(state: &ResourceState, record: &Record) -> StoreResult<bool> {
    let store = &state.app.store;
    match state.kind.dependents() {
        DependentLink::Center(collections) => {
            let query = DocumentQuery::new().in_center(Some(record.id));
            for collection in collections {
                if store.exists(*collection, &query).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        DependentLink::Field(field, collections) => {
            let query = DocumentQuery::new().field_eq(field, record.id.to_string());
            for collection in collections {
                if store.exists(*collection, &query).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        DependentLink::None => Ok(false),
    }
}

pub async fn create_record(
    State(state): State<ResourceState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let trace_id = ctx.trace_id;
    let payload = read_payload(payload, trace_id)?;
    let prepared =
        prepare_payload(state.kind, payload).map_err(|err| err.into_api_error(Some(trace_id)))?;
    let center_id = owning_center(state.kind, &ctx, &prepared)
        .map_err(|err| err.into_api_error(Some(trace_id)))?;
    if let (Some(center_id), None) = (center_id, ctx.center_scope()) {
        ensure_center_exists(&state.app, center_id, trace_id).await?;
    }
    check_references(&state, &prepared, center_id, trace_id).await?;

    let now = Utc::now();
    let record = Record {
        id: Uuid::new_v4(),
        center_id,
        updated_by: ctx.subject,
        created_at: now,
        updated_at: now,
        data: prepared.data,
    };

    let doc = record
        .to_document()
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    state
        .app
        .store
        .insert(state.kind.collection(), doc)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;

    info!(
        collection = state.kind.collection().as_str(),
        id = %record.id,
        actor = %ctx.subject,
        "record created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Query parameters are equality filters on top-level fields.
pub async fn list_records(
    State(state): State<ResourceState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Query(filters): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Record>>> {
    let scope = if state.kind.center_scoped() {
        ctx.center_scope()
    } else {
        None
    };
    let mut query = DocumentQuery::new().in_center(scope);
    let mut filters: Vec<(String, String)> = filters.into_iter().collect();
    filters.sort();
    for (name, value) in filters {
        query = query.field_eq(name, value);
    }

    let docs = state
        .app
        .store
        .find(state.kind.collection(), &query)
        .await
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?;

    let records = docs
        .into_iter()
        .map(Record::from_document)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ApiError::internal(err, Some(ctx.trace_id)))?;
    Ok(Json(records))
}

pub async fn get_record(
    State(state): State<ResourceState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Record>> {
    let id = parse_id(&raw_id, state.kind.not_found_code(), ctx.trace_id)?;
    load_scoped(&state, &ctx, id).await.map(Json)
}

/// Replaces the client-owned fields; id, center and creation time are kept.
pub async fn update_record(
    State(state): State<ResourceState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Path(raw_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Record>> {
    let trace_id = ctx.trace_id;
    let id = parse_id(&raw_id, state.kind.not_found_code(), trace_id)?;
    let payload = read_payload(payload, trace_id)?;
    let existing = load_scoped(&state, &ctx, id).await?;
    let prepared =
        prepare_payload(state.kind, payload).map_err(|err| err.into_api_error(Some(trace_id)))?;
    check_references(&state, &prepared, existing.center_id, trace_id).await?;

    let record = Record {
        id: existing.id,
        center_id: existing.center_id,
        updated_by: ctx.subject,
        created_at: existing.created_at,
        updated_at: Utc::now(),
        data: prepared.data,
    };

    let doc = record
        .to_document()
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    let replaced = state
        .app
        .store
        .replace(state.kind.collection(), doc)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    if !replaced {
        return Err(ApiError::not_found(state.kind.not_found_code(), Some(trace_id)));
    }

    info!(
        collection = state.kind.collection().as_str(),
        id = %record.id,
        actor = %ctx.subject,
        "record updated"
    );
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<ResourceState>,
    SecurityCtxExtractor(ctx): SecurityCtxExtractor,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let trace_id = ctx.trace_id;
    let id = parse_id(&raw_id, state.kind.not_found_code(), trace_id)?;
    let existing = load_scoped(&state, &ctx, id).await?;

    if has_dependents(&state, &existing)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?
    {
        return Err(ApiError::Conflict {
            code: "has_dependents",
            trace_id: Some(trace_id),
            message: Some("Remove the records that reference this one first".into()),
        });
    }

    let deleted = state
        .app
        .store
        .delete(state.kind.collection(), id)
        .await
        .map_err(|err| ApiError::internal(err, Some(trace_id)))?;
    if !deleted {
        return Err(ApiError::not_found(state.kind.not_found_code(), Some(trace_id)));
    }

    info!(
        collection = state.kind.collection().as_str(),
        %id,
        actor = %ctx.subject,
        "record deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
