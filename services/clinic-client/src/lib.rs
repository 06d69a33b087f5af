//! Client side of the clinic records system: HTTP access to the API, the
//! persisted session and the screen guard.

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod navigator;
pub mod session;
pub mod storage;

pub use api::{ApiClient, LoginResponse};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use guard::{ClientRoute, GuardDecision, RouteGuard};
pub use navigator::{Navigation, Navigator};
pub use session::{Session, SessionStore, SessionUser, TOKEN_KEY, USER_KEY};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};

use std::sync::Arc;

/// Wires the API client and durable storage described by `config`.
pub fn session_from_config(config: &ClientConfig) -> ClientResult<SessionStore> {
    let api = ApiClient::new(config)?;
    let storage: Arc<dyn DurableStorage> = match &config.session_file {
        Some(path) => Arc::new(FileStorage::new(path)),
        None => Arc::new(MemoryStorage::new()),
    };
    Ok(SessionStore::new(api, storage))
}
