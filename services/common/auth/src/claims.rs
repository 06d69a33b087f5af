use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Application-focused representation of verified JWT claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    pub subject: Uuid,
    pub role: Role,
    pub center_id: Option<Uuid>,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issuer: String,
}

impl Claims {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Wire shape of the token payload. Shared by the signer so both sides agree
/// on claim names.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub jti: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    pub iss: String,
    pub aud: String,
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let subject = Uuid::parse_str(&value.sub)
            .map_err(|_| AuthError::InvalidClaim("sub", value.sub.clone()))?;
        let role = value.role.parse::<Role>()?;
        let center_id = match value.cid {
            Some(cid) => Some(
                Uuid::parse_str(&cid).map_err(|_| AuthError::InvalidClaim("cid", cid.clone()))?,
            ),
            None => None,
        };
        if role.requires_center() && center_id.is_none() {
            return Err(AuthError::InvalidClaim("cid", String::new()));
        }
        let token_id = Uuid::parse_str(&value.jti)
            .map_err(|_| AuthError::InvalidClaim("jti", value.jti.clone()))?;

        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| AuthError::InvalidClaim("iat", iat.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            subject,
            role,
            center_id,
            token_id,
            expires_at,
            issued_at,
            issuer: value.iss,
        })
    }
}
