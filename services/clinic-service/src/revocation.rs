use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_security::{RevocationList, SecurityError};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::store::{Collection, DocumentQuery, DocumentStore, StoreResult, StoredDocument};

/// Token ids invalidated by logout, kept in the `revoked_tokens` collection.
#[derive(Clone)]
pub struct StoreRevocations {
    store: Arc<dyn DocumentStore>,
}

impl StoreRevocations {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Idempotent: revoking an already revoked id is a no-op. Entries whose
    /// token has expired are pruned on the way.
    pub async fn revoke(&self, token_id: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let now = Utc::now();
        self.purge_expired(now).await?;
        if self.store.get(Collection::RevokedTokens, token_id).await?.is_some() {
            return Ok(());
        }
        self.store
            .insert(
                Collection::RevokedTokens,
                StoredDocument {
                    id: token_id,
                    center_id: None,
                    updated_at: now,
                    body: json!({
                        "id": token_id,
                        "revokedAt": now,
                        "expiresAt": expires_at,
                    }),
                },
            )
            .await
    }

    /// An expired token fails verification on its own, so its entry is dead
    /// weight. Returns how many entries were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let entries = self
            .store
            .find(Collection::RevokedTokens, &DocumentQuery::new())
            .await?;
        let mut removed = 0;
        for doc in entries {
            let expires_at = doc
                .body
                .get("expiresAt")
                .cloned()
                .and_then(|value: Value| serde_json::from_value::<DateTime<Utc>>(value).ok());
            if matches!(expires_at, Some(at) if at <= now)
                && self.store.delete(Collection::RevokedTokens, doc.id).await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "pruned expired token revocations");
        }
        Ok(removed)
    }
}

#[async_trait]
impl RevocationList for StoreRevocations {
    async fn is_revoked(&self, token_id: Uuid) -> Result<bool, SecurityError> {
        self.store
            .get(Collection::RevokedTokens, token_id)
            .await
            .map(|doc| doc.is_some())
            .map_err(|err| SecurityError::Internal(err.to_string()))
    }
}
