//! Client-side session: a reactive copy for the running UI and a durable
//! copy that survives restarts.
//!
//! Durable storage is the source of truth across restarts. At startup
//! [`SessionStore::restore_from_storage`] reconciles the two exactly once;
//! afterwards they never disagree on user id or role.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use common_auth::Role;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::storage::DurableStorage;

pub const TOKEN_KEY: &str = "clinic.session.token";
pub const USER_KEY: &str = "clinic.session.user";

/// Identity snapshot returned by login and kept alongside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: SessionUser,
    pub token: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The unverified claims the client reads from a token. The signature is
/// the server's business; the client only needs expiry and identity.
#[derive(Debug, Deserialize)]
struct TokenPayload {
    sub: String,
    role: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
}

fn decode_payload(token: &str) -> ClientResult<TokenPayload> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClientError::InvalidToken("expected three segments".into())),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|err| ClientError::InvalidToken(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| ClientError::InvalidToken(err.to_string()))
}

fn timestamp(secs: i64) -> ClientResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ClientError::InvalidToken(format!("timestamp out of range: {secs}")))
}

/// Builds a session, refusing tokens whose subject or role differ from
/// the user snapshot.
fn session_from_parts(token: String, user: SessionUser) -> ClientResult<Session> {
    let payload = decode_payload(&token)?;
    let role: Role = payload
        .role
        .parse()
        .map_err(|_| ClientError::InvalidToken(format!("unknown role '{}'", payload.role)))?;
    let subject = Uuid::parse_str(&payload.sub)
        .map_err(|err| ClientError::InvalidToken(err.to_string()))?;
    if subject != user.id || role != user.role {
        return Err(ClientError::TokenMismatch);
    }
    Ok(Session {
        user,
        token,
        issued_at: payload.iat.map(timestamp).transpose()?,
        expires_at: timestamp(payload.exp)?,
    })
}

pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn DurableStorage>,
    current: watch::Sender<Option<Session>>,
    restored: AtomicBool,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Arc<dyn DurableStorage>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            api,
            storage,
            current,
            restored: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.current.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn is_restored(&self) -> bool {
        self.restored.load(Ordering::Acquire)
    }

    fn publish(&self, session: Option<Session>) {
        self.current.send_replace(session);
    }

    /// Durable copy first, reactive copy second, so a crash in between never
    /// leaves the UI holding a session storage does not know about.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<SessionUser> {
        let resp = self.api.login(email, password).await?;
        let session = session_from_parts(resp.token, resp.user)?;
        if session.is_expired_at(Utc::now()) {
            warn!(user_id = %session.user.id, "login returned an expired token");
            return Err(ClientError::Expired);
        }

        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage
            .set(USER_KEY, &serde_json::to_string(&session.user)?)?;

        let user = session.user.clone();
        info!(user_id = %user.id, role = %user.role, "signed in");
        self.publish(Some(session));
        Ok(user)
    }

    /// Startup reconciliation. Publishes the durable session when it is
    /// present, decodes, matches its snapshot and has not expired; otherwise
    /// clears durable storage and the reactive store. Runs once.
    pub async fn restore_from_storage(&self) -> ClientResult<Option<SessionUser>> {
        self.restore_at(Utc::now())
    }

    /// A storage failure leaves the store unrestored so the call can be
    /// retried.
    pub fn restore_at(&self, now: DateTime<Utc>) -> ClientResult<Option<SessionUser>> {
        if self.restored.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyRestored);
        }
        let outcome = self.reconcile(now);
        if outcome.is_err() {
            self.restored.store(false, Ordering::Release);
        }
        outcome
    }

    fn reconcile(&self, now: DateTime<Utc>) -> ClientResult<Option<SessionUser>> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;

        let restored = match (token, user) {
            (Some(token), Some(user)) => {
                match serde_json::from_str::<SessionUser>(&user)
                    .map_err(ClientError::from)
                    .and_then(|user| session_from_parts(token, user))
                {
                    Ok(session) if !session.is_expired_at(now) => Some(session),
                    Ok(session) => {
                        debug!(user_id = %session.user.id, "stored session expired");
                        None
                    }
                    Err(err) => {
                        warn!(error = %err, "discarding unreadable stored session");
                        None
                    }
                }
            }
            (None, None) => None,
            _ => {
                warn!("discarding half-written stored session");
                None
            }
        };

        match restored {
            Some(session) => {
                let user = session.user.clone();
                info!(user_id = %user.id, role = %user.role, "session restored");
                self.publish(Some(session));
                Ok(Some(user))
            }
            None => {
                self.clear_durable()?;
                if self.current.borrow().is_some() {
                    debug!("clearing stale in-memory session");
                }
                self.publish(None);
                Ok(None)
            }
        }
    }

    fn clear_durable(&self) -> ClientResult<()> {
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        token.and(user)
    }

    /// Tells the server to revoke the token when there is one, then clears
    /// both copies whatever the server said.
    pub async fn logout(&self) -> ClientResult<()> {
        if let Some(token) = self.token() {
            if let Err(err) = self.api.logout(&token).await {
                warn!(error = %err, "server logout failed; clearing local session anyway");
            }
        }
        self.publish(None);
        self.clear_durable()?;
        info!("signed out");
        Ok(())
    }

    /// True when a session is held and its token is past `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|session| session.is_expired_at(now))
    }

    /// Local-only sign out, used when the server has already rejected the
    /// token or it has run out.
    pub fn expire(&self) -> ClientResult<()> {
        self.publish(None);
        self.clear_durable()
    }
}
