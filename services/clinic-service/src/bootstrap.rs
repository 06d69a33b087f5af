use anyhow::{Context, Result};
use chrono::Utc;
use common_auth::Role;
use tracing::info;
use uuid::Uuid;

use crate::config::BootstrapAdmin;
use crate::identity::{hash_password, normalize_email, CredentialStore, Identity, IdentityStatus};

/// Creates the first superadmin when none exists. Returns whether an
/// account was created.
pub async fn ensure_superadmin(credentials: &CredentialStore, admin: &BootstrapAdmin) -> Result<bool> {
    if credentials
        .any_with_role(Role::SuperAdmin)
        .await
        .context("Failed to look up existing superadmins")?
    {
        return Ok(false);
    }

    let email = normalize_email(&admin.email);
    if credentials
        .find_by_email(&email)
        .await
        .context("Failed to check bootstrap email")?
        .is_some()
    {
        anyhow::bail!("bootstrap email {email} is already used by another account");
    }

    let now = Utc::now();
    let identity = Identity {
        id: Uuid::new_v4(),
        name: admin.name.clone(),
        email,
        password_hash: hash_password(&admin.password)
            .context("Failed to hash bootstrap password")?,
        role: Role::SuperAdmin,
        center_id: None,
        patient_id: None,
        status: IdentityStatus::Active,
        created_at: now,
        updated_at: now,
        updated_by: None,
    };
    credentials
        .insert(&identity)
        .await
        .context("Failed to store bootstrap superadmin")?;

    info!(id = %identity.id, email = %identity.email, "bootstrap superadmin created");
    Ok(true)
}
