//! Login identities for every role, with their credential hashes.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use common_auth::Role;
use once_cell::sync::Lazy;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::store::{Collection, DocumentQuery, DocumentStore, StoreResult, StoredDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub status: IdentityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
}

/// What the session needs to know about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_id: Option<Uuid>,
}

/// Staff-management representation; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    pub status: IdentityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
}

impl Identity {
    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }

    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            center_id: self.center_id,
        }
    }

    pub fn view(&self) -> IdentityView {
        IdentityView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            center_id: self.center_id,
            patient_id: self.patient_id,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
        }
    }

    fn to_document(&self) -> StoreResult<StoredDocument> {
        Ok(StoredDocument {
            id: self.id,
            center_id: self.center_id,
            updated_at: self.updated_at,
            body: serde_json::to_value(self)?,
        })
    }

    fn from_document(doc: StoredDocument) -> StoreResult<Self> {
        Ok(serde_json::from_value(doc.body)?)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,
    #[error("failed to hash password: {0}")]
    Hash(String),
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.trim().is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Unparsable hashes never verify.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("not-a-real-account").ok());

/// Runs a full verification against a throwaway hash so an unknown email
/// costs as much as a wrong password. Always false.
pub fn verify_unknown_account(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

/// Identity persistence over the per-role collections.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn DocumentStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Emails are unique across every role, so at most one match exists.
    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let query = DocumentQuery::new()
            .field_eq("email", normalize_email(email))
            .limit(1);
        for collection in Collection::IDENTITIES {
            if let Some(doc) = self.store.find(collection, &query).await?.into_iter().next() {
                return Identity::from_document(doc).map(Some);
            }
        }
        Ok(None)
    }

    pub async fn email_taken(&self, email: &str, except: Option<Uuid>) -> StoreResult<bool> {
        Ok(self
            .find_by_email(email)
            .await?
            .is_some_and(|existing| Some(existing.id) != except))
    }

    pub async fn get(&self, role: Role, id: Uuid) -> StoreResult<Option<Identity>> {
        self.store
            .get(Collection::for_role(role), id)
            .await?
            .map(Identity::from_document)
            .transpose()
    }

    pub async fn list(&self, role: Role, query: &DocumentQuery) -> StoreResult<Vec<Identity>> {
        self.store
            .find(Collection::for_role(role), query)
            .await?
            .into_iter()
            .map(Identity::from_document)
            .collect()
    }

    pub async fn insert(&self, identity: &Identity) -> StoreResult<()> {
        self.store
            .insert(Collection::for_role(identity.role), identity.to_document()?)
            .await
    }

    pub async fn replace(&self, identity: &Identity) -> StoreResult<bool> {
        self.store
            .replace(Collection::for_role(identity.role), identity.to_document()?)
            .await
    }

    pub async fn delete(&self, role: Role, id: Uuid) -> StoreResult<bool> {
        self.store.delete(Collection::for_role(role), id).await
    }

    pub async fn any_with_role(&self, role: Role) -> StoreResult<bool> {
        self.store
            .exists(Collection::for_role(role), &DocumentQuery::new())
            .await
    }
}
