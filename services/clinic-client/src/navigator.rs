use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::guard::{ClientRoute, GuardDecision, RouteGuard};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Navigation<T> {
    /// The screen was entered; `data` is its initial payload when it loads one.
    Rendered { route: ClientRoute, data: Option<T> },
    Redirected(ClientRoute),
}

/// Drives screen changes in the order restore, guard, fetch. Data for a
/// guarded screen is never requested before the guard has let the user in.
pub struct Navigator {
    session: Arc<SessionStore>,
    guard: RouteGuard,
}

impl Navigator {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            session,
            guard: RouteGuard,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn navigate<T: DeserializeOwned>(
        &self,
        route: ClientRoute,
    ) -> ClientResult<Navigation<T>> {
        if !self.session.is_restored() {
            return Err(ClientError::NotRestored);
        }

        if self.session.is_expired_at(Utc::now()) {
            info!("session expired; signing out locally");
            self.session.expire()?;
        }

        let user = self.session.current_user();
        if let GuardDecision::Redirect(target) = self.guard.can_enter(&route, user.as_ref()) {
            debug!(from = %route.path(), to = %target.path(), "guard redirect");
            return Ok(Navigation::Redirected(target));
        }

        let Some(path) = route.data_path() else {
            return Ok(Navigation::Rendered { route, data: None });
        };
        let token = self.session.token().ok_or(ClientError::NotAuthenticated)?;

        match self.session.api().get_json::<T>(&path, &token).await {
            Ok(data) => Ok(Navigation::Rendered {
                route,
                data: Some(data),
            }),
            Err(err) if err.is_unauthenticated() => {
                info!("server rejected session; signing out locally");
                self.session.expire()?;
                Ok(Navigation::Redirected(ClientRoute::Login))
            }
            Err(err) => Err(err),
        }
    }
}
