use common_http_errors::ApiError;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Payload problems reported to the caller as 400 with a stable code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must be a valid id")]
    InvalidReference(&'static str),
    #[error("{0} has an invalid value")]
    InvalidValue(&'static str),
    #[error("role cannot be changed")]
    ImmutableRole,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::NotAnObject => "invalid_payload",
            ValidationError::Missing(field) => missing_code(field),
            ValidationError::InvalidReference(field) | ValidationError::InvalidValue(field) => {
                invalid_code(field)
            }
            ValidationError::ImmutableRole => "immutable_role",
        }
    }

    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        ApiError::bad_request(self.code(), self.to_string(), trace_id)
    }
}

fn missing_code(field: &str) -> &'static str {
    match field {
        "name" => "missing_name",
        "email" => "missing_email",
        "password" => "missing_password",
        "centerId" => "missing_centerId",
        "patientId" => "missing_patientId",
        _ => "missing_field",
    }
}

fn invalid_code(field: &str) -> &'static str {
    match field {
        "email" => "invalid_email",
        "status" => "invalid_status",
        "centerId" => "invalid_centerId",
        "patientId" => "invalid_patientId",
        _ => "invalid_field",
    }
}

pub fn as_object(payload: Value) -> Result<Map<String, Value>, ValidationError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationError::NotAnObject),
    }
}

/// A field counts as present unless it is absent, null, or a blank string.
pub fn is_present(data: &Map<String, Value>, field: &str) -> bool {
    match data.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

pub fn require(data: &Map<String, Value>, field: &'static str) -> Result<(), ValidationError> {
    if is_present(data, field) {
        Ok(())
    } else {
        Err(ValidationError::Missing(field))
    }
}

/// Reads an optional id-valued field; present but unparsable is an error.
pub fn optional_id(
    data: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<Uuid>, ValidationError> {
    if !is_present(data, field) {
        return Ok(None);
    }
    data.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(Some)
        .ok_or(ValidationError::InvalidReference(field))
}

pub fn required_id(data: &Map<String, Value>, field: &'static str) -> Result<Uuid, ValidationError> {
    optional_id(data, field)?.ok_or(ValidationError::Missing(field))
}
