//! The session state machine.
//!
//! `SessionManager` owns the process-wide authentication state and is the
//! only component that mutates it. State lives behind a `tokio::sync::watch`
//! channel so consumers can read the current value synchronously or
//! subscribe for changes.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, SessionInfo};
use crate::cache::IdentityPurge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    Error,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: AuthStatus,
    /// Invariant: `Some` iff `status` is `Authenticated`.
    pub user: Option<String>,
    pub last_error: Option<String>,
}

impl SessionState {
    fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            user: None,
            last_error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    /// The identity used to scope cache keys, present only when
    /// authenticated.
    pub fn identity(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.user.as_deref()
        } else {
            None
        }
    }
}

pub struct SessionManager {
    client: ApiClient,
    state: watch::Sender<SessionState>,
    /// Cache to purge when a logout clears an identity; registered once at
    /// startup, after the cache itself has been constructed.
    purge_target: OnceLock<Arc<dyn IdentityPurge>>,
}

impl SessionManager {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::anonymous());
        Self {
            client,
            state,
            purge_target: OnceLock::new(),
        }
    }

    pub fn set_purge_target(&self, target: Arc<dyn IdentityPurge>) {
        let _ = self.purge_target.set(target);
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes (re-delivery on every transition).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Log in and verify the resulting session, strictly in that order.
    ///
    /// On success the state is `Authenticated` and the caller performs its
    /// navigation side effect exactly once. On any failure the state lands
    /// in `Error` with a message and the same failure is returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        self.state.send_modify(|s| {
            s.status = AuthStatus::Authenticating;
            s.user = None;
            s.last_error = None;
        });

        if let Err(err) = self.client.login(username, password).await {
            let message = err.to_string();
            warn!(error = %message, "login failed");
            self.state.send_modify(|s| {
                s.status = AuthStatus::Error;
                s.user = None;
                s.last_error = Some(message);
            });
            return Err(err);
        }

        if !self.verify_session().await {
            let message = "session verification failed".to_string();
            warn!("{message}");
            self.state.send_modify(|s| {
                s.status = AuthStatus::Error;
                s.user = None;
                s.last_error = Some(message.clone());
            });
            return Err(ApiError::Application {
                status: 401,
                message,
            });
        }

        info!(user = ?self.current().user, "login succeeded");
        Ok(())
    }

    /// Ask the server whether the current session is valid.
    ///
    /// Never fails: always settles the machine in `Authenticated` (with the
    /// reported identity) or `Anonymous` (identity cleared) and returns
    /// which one it was. Concurrent calls are independent round-trips and
    /// the last one to resolve wins; callers must tolerate that race.
    pub async fn verify_session(&self) -> bool {
        match self.client.session().await {
            Ok(SessionInfo {
                authenticated: true,
                user: Some(user),
            }) => {
                self.state.send_modify(|s| {
                    s.status = AuthStatus::Authenticated;
                    s.user = Some(user.clone());
                });
                true
            }
            Ok(info) => {
                if info.authenticated {
                    warn!("session endpoint reported authenticated without a user, treating as anonymous");
                }
                self.settle_anonymous();
                false
            }
            Err(err) => {
                debug!(error = %err, "session verification request failed");
                self.settle_anonymous();
                false
            }
        }
    }

    /// End the session.
    ///
    /// The server call is best-effort: local state always ends up
    /// `Anonymous` and the departing identity's cache entries are purged,
    /// whether or not the logout request succeeded. The caller navigates
    /// back to the public area afterwards.
    pub async fn logout(&self) {
        let departing = self.current().user;

        self.state.send_modify(|s| {
            s.status = AuthStatus::Authenticating;
            s.user = None;
        });

        let error = match self.client.logout().await {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "logout request failed, clearing local session anyway");
                Some("logout failed".to_string())
            }
        };

        self.state.send_modify(|s| {
            s.status = AuthStatus::Anonymous;
            s.user = None;
            s.last_error = error.clone();
        });

        if let Some(identity) = departing {
            if let Some(purge) = self.purge_target.get() {
                purge.purge_identity(&identity);
            }
        }
        info!("logged out");
    }

    /// Drop to `Anonymous` with the identity cleared. Leaves `last_error`
    /// alone; verification failing is not an error condition.
    fn settle_anonymous(&self) {
        self.state.send_modify(|s| {
            s.status = AuthStatus::Anonymous;
            s.user = None;
        });
    }
}
