//! Centers, patients and the clinical documents hanging off a patient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::store::{Collection, StoreResult, StoredDocument};
use crate::validation::{as_object, optional_id, require, required_id, ValidationError};

/// Keys the server owns; anything the client sends under these is dropped.
pub const RESERVED_FIELDS: [&str; 5] = ["id", "centerId", "updatedBy", "createdAt", "updatedAt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Center,
    Patient,
    Rhinitis,
    Conjunctivitis,
    Bronchitis,
    Dermatitis,
    Gpe,
    Prescription,
    VisitHistory,
}

/// How other documents refer to a record of this kind.
#[derive(Debug, Clone, Copy)]
pub enum DependentLink {
    /// Dependents carry the record's id as their owning center.
    Center(&'static [Collection]),
    /// Dependents carry the record's id in a top-level body field.
    Field(&'static str, &'static [Collection]),
    None,
}

const CENTER_DEPENDENTS: &[Collection] = &[
    Collection::CenterAdmins,
    Collection::Doctors,
    Collection::Receptionists,
    Collection::LabStaff,
    Collection::PatientAccounts,
    Collection::Patients,
    Collection::Rhinitis,
    Collection::Conjunctivitis,
    Collection::Bronchitis,
    Collection::Dermatitis,
    Collection::Gpe,
    Collection::Prescriptions,
    Collection::VisitHistory,
];

const PATIENT_DEPENDENTS: &[Collection] = &[
    Collection::Rhinitis,
    Collection::Conjunctivitis,
    Collection::Bronchitis,
    Collection::Dermatitis,
    Collection::Gpe,
    Collection::Prescriptions,
    Collection::VisitHistory,
    Collection::PatientAccounts,
];

impl ResourceKind {
    pub const FOLLOW_UPS: [ResourceKind; 5] = [
        ResourceKind::Rhinitis,
        ResourceKind::Conjunctivitis,
        ResourceKind::Bronchitis,
        ResourceKind::Dermatitis,
        ResourceKind::Gpe,
    ];

    pub fn collection(self) -> Collection {
        match self {
            ResourceKind::Center => Collection::Centers,
            ResourceKind::Patient => Collection::Patients,
            ResourceKind::Rhinitis => Collection::Rhinitis,
            ResourceKind::Conjunctivitis => Collection::Conjunctivitis,
            ResourceKind::Bronchitis => Collection::Bronchitis,
            ResourceKind::Dermatitis => Collection::Dermatitis,
            ResourceKind::Gpe => Collection::Gpe,
            ResourceKind::Prescription => Collection::Prescriptions,
            ResourceKind::VisitHistory => Collection::VisitHistory,
        }
    }

    /// Path segment under `/api/followups/`.
    pub fn slug(self) -> &'static str {
        self.collection().as_str()
    }

    pub fn center_scoped(self) -> bool {
        !matches!(self, ResourceKind::Center)
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Center | ResourceKind::Patient => &["name"],
            _ => &[],
        }
    }

    /// Id-valued fields; each must be present and parse.
    pub fn reference_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Center | ResourceKind::Patient => &[],
            _ => &["patientId"],
        }
    }

    pub fn not_found_code(self) -> &'static str {
        match self {
            ResourceKind::Center => "center_not_found",
            ResourceKind::Patient => "patient_not_found",
            ResourceKind::Prescription => "prescription_not_found",
            ResourceKind::VisitHistory => "history_not_found",
            _ => "followup_not_found",
        }
    }

    pub fn dependents(self) -> DependentLink {
        match self {
            ResourceKind::Center => DependentLink::Center(CENTER_DEPENDENTS),
            ResourceKind::Patient => DependentLink::Field("patientId", PATIENT_DEPENDENTS),
            _ => DependentLink::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_id: Option<Uuid>,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Record {
    pub fn to_document(&self) -> StoreResult<StoredDocument> {
        Ok(StoredDocument {
            id: self.id,
            center_id: self.center_id,
            updated_at: self.updated_at,
            body: serde_json::to_value(self)?,
        })
    }

    pub fn from_document(doc: StoredDocument) -> StoreResult<Self> {
        Ok(serde_json::from_value(doc.body)?)
    }
}

/// Client payload after validation: server-owned keys stripped, plus the
/// center the client asked for (only honoured for superadmins).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPayload {
    pub data: Map<String, Value>,
    pub requested_center: Option<Uuid>,
}

pub fn prepare_payload(kind: ResourceKind, payload: Value) -> Result<RecordPayload, ValidationError> {
    let mut data = as_object(payload)?;
    let requested_center = optional_id(&data, "centerId")?;
    for key in RESERVED_FIELDS {
        data.remove(key);
    }

    for field in kind.required_fields() {
        require(&data, field)?;
    }
    for field in kind.reference_fields() {
        let id = required_id(&data, field)?;
        data.insert((*field).to_string(), Value::String(id.to_string()));
    }

    Ok(RecordPayload {
        data,
        requested_center,
    })
}
