use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenCodec};
use crate::config::AuthConfig;
use crate::store::{TaskStore, UserStore};

/// Everything a request needs, built once at startup and shared through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub tokens: TokenCodec,
    pub passwords: PasswordHasher,
}

impl AppState {
    /// Uses one backend for both users and tasks.
    pub fn new<S>(store: S, auth: &AuthConfig) -> Self
    where
        S: UserStore + TaskStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            tasks: store,
            tokens: TokenCodec::new(auth),
            passwords: PasswordHasher::new(auth),
        }
    }
}
