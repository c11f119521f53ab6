//! Client-side session: the signed-in user and their bearer token.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use super::storage::{DurableStore, TOKEN_KEY, USER_KEY};

/// A signed-in user and the token the server issued for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Value,
    pub token: String,
}

/// Read the current session, sign in, sign out.
pub trait SessionProvider: Send + Sync {
    fn session(&self) -> Option<Session>;
    fn login(&self, user: Value, token: String);
    fn logout(&self);

    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }
}

/// Session kept in memory and mirrored into a [`DurableStore`].
///
/// Without a store (server-side rendering) the session lives in memory only:
/// hydration finds nothing and writes are skipped.
pub struct SessionContext {
    store: Option<Arc<dyn DurableStore>>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    pub fn new(store: Option<Arc<dyn DurableStore>>) -> Self {
        let current = hydrate(store.as_deref());
        Self {
            store,
            current: RwLock::new(current),
        }
    }

    pub fn detached() -> Self {
        Self::new(None)
    }

    pub fn store(&self) -> Option<Arc<dyn DurableStore>> {
        self.store.clone()
    }

    pub fn into_provider(self) -> Arc<dyn SessionProvider> {
        Arc::new(self)
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let Some(store) = &self.store else {
            return;
        };
        let res = match value {
            Some(v) => store.set(key, v),
            None => store.remove(key),
        };
        if let Err(e) = res {
            warn!(error = %e, key, "session storage write failed");
        }
    }
}

/// Both keys must be present and non-empty, and the user must parse.
fn hydrate(store: Option<&dyn DurableStore>) -> Option<Session> {
    let store = store?;
    let user = store.get(USER_KEY).filter(|v| !v.is_empty());
    let token = store.get(TOKEN_KEY).filter(|v| !v.is_empty());
    let (Some(user), Some(token)) = (user, token) else {
        debug!("no stored session");
        return None;
    };
    match serde_json::from_str(&user) {
        Ok(user) => Some(Session { user, token }),
        Err(e) => {
            warn!(error = %e, "discarding unreadable stored user");
            None
        }
    }
}

impl SessionProvider for SessionContext {
    fn session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn login(&self, user: Value, token: String) {
        let serialized = user.to_string();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Session {
            user,
            token: token.clone(),
        });
        self.persist(USER_KEY, Some(&serialized));
        self.persist(TOKEN_KEY, Some(&token));
        debug!("session stored");
    }

    fn logout(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.persist(USER_KEY, None);
        self.persist(TOKEN_KEY, None);
        debug!("session cleared");
    }
}
