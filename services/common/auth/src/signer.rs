use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use crate::claims::ClaimsRepr;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Who a token is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub role: Role,
    pub center_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
    pub token_type: &'static str,
}

/// Issues HS256 access tokens with the server-held secret.
pub struct TokenSigner {
    config: JwtConfig,
    encoding_key: EncodingKey,
}

impl TokenSigner {
    pub fn from_secret(config: JwtConfig, secret: &[u8]) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Signing("signing secret must not be empty".into()));
        }
        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(secret),
        })
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn issue(&self, subject: &TokenSubject) -> AuthResult<IssuedToken> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, subject: &TokenSubject, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let expires_at = now + Duration::seconds(self.config.ttl_seconds);
        let token_id = Uuid::new_v4();

        let claims = ClaimsRepr {
            sub: subject.user_id.to_string(),
            role: subject.role.as_str().to_string(),
            cid: subject.center_id.map(|id| id.to_string()),
            jti: token_id.to_string(),
            exp: expires_at.timestamp(),
            iat: Some(now.timestamp()),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            token_id,
            issued_at: now,
            expires_at,
            expires_in: self.config.ttl_seconds,
            token_type: "Bearer",
        })
    }
}
