//! Document storage for every collection the clinic keeps.
//!
//! Records are schemaless JSON bodies indexed by id, an optional owning
//! center, and a last-modified timestamp. Two backends exist: Postgres
//! (`documents` table with a JSONB body) and an in-process map used for
//! development and tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_auth::Role;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    SuperAdmins,
    CenterAdmins,
    Doctors,
    Receptionists,
    LabStaff,
    PatientAccounts,
    Centers,
    Patients,
    Rhinitis,
    Conjunctivitis,
    Bronchitis,
    Dermatitis,
    Gpe,
    Prescriptions,
    VisitHistory,
    RevokedTokens,
}

impl Collection {
    /// One collection per role; login searches all of them.
    pub const IDENTITIES: [Collection; 6] = [
        Collection::SuperAdmins,
        Collection::CenterAdmins,
        Collection::Doctors,
        Collection::Receptionists,
        Collection::LabStaff,
        Collection::PatientAccounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::SuperAdmins => "superadmins",
            Collection::CenterAdmins => "centeradmins",
            Collection::Doctors => "doctors",
            Collection::Receptionists => "receptionists",
            Collection::LabStaff => "lab_staff",
            Collection::PatientAccounts => "patient_accounts",
            Collection::Centers => "centers",
            Collection::Patients => "patients",
            Collection::Rhinitis => "rhinitis",
            Collection::Conjunctivitis => "conjunctivitis",
            Collection::Bronchitis => "bronchitis",
            Collection::Dermatitis => "dermatitis",
            Collection::Gpe => "gpe",
            Collection::Prescriptions => "prescriptions",
            Collection::VisitHistory => "visit_history",
            Collection::RevokedTokens => "revoked_tokens",
        }
    }

    pub fn for_role(role: Role) -> Self {
        match role {
            Role::SuperAdmin => Collection::SuperAdmins,
            Role::CenterAdmin => Collection::CenterAdmins,
            Role::Doctor => Collection::Doctors,
            Role::Receptionist => Collection::Receptionists,
            Role::Lab => Collection::LabStaff,
            Role::Patient => Collection::PatientAccounts,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub center_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub body: Value,
}

/// Conjunctive filter over a collection. Field filters compare top-level
/// body keys for JSON equality.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub center_id: Option<Uuid>,
    pub fields: Vec<(String, Value)>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_center(mut self, center_id: Option<Uuid>) -> Self {
        self.center_id = center_id;
        self
    }

    pub fn field_eq(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &StoredDocument) -> bool {
        if let Some(center_id) = self.center_id {
            if doc.center_id != Some(center_id) {
                return false;
            }
        }
        self.fields
            .iter()
            .all(|(name, expected)| doc.body.get(name) == Some(expected))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, doc: StoredDocument) -> StoreResult<()>;

    async fn get(&self, collection: Collection, id: Uuid) -> StoreResult<Option<StoredDocument>>;

    /// Returns `false` when no document with that id exists.
    async fn replace(&self, collection: Collection, doc: StoredDocument) -> StoreResult<bool>;

    async fn delete(&self, collection: Collection, id: Uuid) -> StoreResult<bool>;

    /// Most recently updated first, ties broken by id.
    async fn find(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<StoredDocument>>;

    async fn exists(&self, collection: Collection, query: &DocumentQuery) -> StoreResult<bool> {
        let query = query.clone().limit(1);
        Ok(!self.find(collection, &query).await?.is_empty())
    }
}
