//! Auth service contract and the in-process provider.
//!
//! The controller only needs four things from an auth backend: the session
//! it currently holds, sign-in/sign-out requests, and a stream of session
//! changes. [`LocalAuth`] serves them from a fixed provider → account table.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::services::listeners::{ListenerHandle, ListenerRegistry};
use crate::types::errors::AuthError;
use crate::types::session::{AuthProvider, Session, UserId};
use crate::types::settings::AuthSettings;

/// Handle returned by [`AuthService::on_session_change`].
pub type SessionSubscription = ListenerHandle;

/// Called with the new session (or `None`) on every session change.
pub type SessionCallback = Arc<dyn Fn(Option<Session>) + Send + Sync>;

/// Trait defining the auth operations the controller consumes.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;
    async fn sign_in(&self, provider: AuthProvider) -> Result<(), AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    fn on_session_change(&self, callback: SessionCallback) -> SessionSubscription;
    /// Deregisters a listener. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SessionSubscription);
}

/// In-process auth provider backed by a provider → account table.
pub struct LocalAuth {
    accounts: Mutex<BTreeMap<AuthProvider, UserId>>,
    session: Mutex<Option<Session>>,
    listeners: ListenerRegistry<SessionCallback>,
}

impl LocalAuth {
    pub fn new(accounts: BTreeMap<AuthProvider, UserId>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            session: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.accounts.clone())
    }

    fn accounts(&self) -> MutexGuard<'_, BTreeMap<AuthProvider, UserId>> {
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Maps `provider` to `user`, replacing any previous account.
    pub fn set_account(&self, provider: AuthProvider, user: UserId) {
        self.accounts().insert(provider, user);
    }

    /// Drops the current session as if its token had expired.
    pub fn expire(&self) {
        if self.session().is_some() {
            tracing::info!("local session expired");
            self.replace_session(None);
        }
    }

    /// Number of registered session listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn replace_session(&self, next: Option<Session>) {
        *self.session() = next.clone();
        for callback in self.listeners.snapshot() {
            callback(next.clone());
        }
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session().clone())
    }

    async fn sign_in(&self, provider: AuthProvider) -> Result<(), AuthError> {
        let user_id = self
            .accounts()
            .get(&provider)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;

        tracing::info!(%provider, user = %user_id, "signed in");
        self.replace_session(Some(Session {
            user_id,
            access_token: Uuid::new_v4().to_string(),
        }));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.session().is_some() {
            tracing::info!("signed out");
            self.replace_session(None);
        }
        Ok(())
    }

    fn on_session_change(&self, callback: SessionCallback) -> SessionSubscription {
        self.listeners.register(callback)
    }

    fn unsubscribe(&self, handle: SessionSubscription) {
        if !self.listeners.remove(handle) {
            tracing::debug!(handle = handle.id(), "session listener already removed");
        }
    }
}
