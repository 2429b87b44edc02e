//! Remote-call retry layer
//!
//! Every remote call the engine makes goes through [`RemoteCaller::call`],
//! which absorbs the two transient outcomes of the service protocol:
//!
//! - `RATE_LIMIT_REACHED(seconds)` - validate the duration, emit
//!   [`SyncEvent::RateLimitExceeded`], sleep (cancellably), then repeat
//!   the call with identical arguments. The service guarantees the retry
//!   yields the same semantic result as an immediate success would have.
//! - `AUTH_EXPIRED` - ask the broker for fresh credentials (the user's
//!   own token, or all linked-notebook tokens when syncing shared
//!   content), then repeat the call.
//!
//! Everything else maps to a terminal [`SyncError`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quillsync_core::domain::{AuthToken, ErrorString, Guid, LinkedNotebook, Scope};
use quillsync_core::ports::{AuthData, IAuthTokenBroker, RemoteError, RemoteResult};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::events::{EventEmitter, SyncEvent};

/// Linked-notebook tokens this close to expiry are refreshed in bulk
/// before linked-notebook sync begins.
pub const TOKEN_EXPIRY_MARGIN_MINUTES: i64 = 30;

/// Consecutive `AUTH_EXPIRED` responses tolerated for one call before the
/// session fails (a refresh that does not take effect would loop forever).
const MAX_AUTH_RETRIES: u32 = 2;

// ============================================================================
// AuthState
// ============================================================================

/// Session-wide token cache in front of the broker.
///
/// Holds the user's own token plus per-linked-notebook tokens with their
/// expiry. Refreshing is broadcast through the event channel so callers
/// (and any in-flight work that cares) observe the request.
pub struct AuthState {
    broker: Arc<dyn IAuthTokenBroker>,
    user_token: RwLock<Option<AuthToken>>,
    linked_tokens: RwLock<HashMap<Guid, AuthData>>,
    linked_notebooks: RwLock<HashMap<Guid, LinkedNotebook>>,
}

impl AuthState {
    pub fn new(broker: Arc<dyn IAuthTokenBroker>) -> Self {
        Self {
            broker,
            user_token: RwLock::new(None),
            linked_tokens: RwLock::new(HashMap::new()),
            linked_notebooks: RwLock::new(HashMap::new()),
        }
    }

    /// Makes the linked notebooks of the current session known, so that
    /// scope-wide token refreshes know what to refresh.
    pub async fn register_linked_notebooks(&self, linked_notebooks: &[LinkedNotebook]) {
        let mut map = self.linked_notebooks.write().await;
        for ln in linked_notebooks {
            if let Some(guid) = &ln.guid {
                map.insert(guid.clone(), ln.clone());
            }
        }
    }

    /// Returns the current token for `scope`, asking the broker on first
    /// use. Public linked notebooks use the empty token.
    pub async fn token_for(&self, scope: &Scope) -> Result<AuthToken, SyncError> {
        match scope {
            Scope::UserOwn => {
                if let Some(token) = self.user_token.read().await.clone() {
                    return Ok(token);
                }
                let token = self
                    .broker
                    .user_auth_token()
                    .await
                    .map_err(|e| auth_error("failed to obtain the user's auth token", e))?;
                *self.user_token.write().await = Some(token.clone());
                Ok(token)
            }
            Scope::LinkedNotebook(guid) => {
                if let Some(data) = self.linked_tokens.read().await.get(guid) {
                    return Ok(data.token.clone());
                }
                let ln = self
                    .linked_notebooks
                    .read()
                    .await
                    .get(guid)
                    .cloned()
                    .ok_or_else(|| {
                        SyncError::Auth(ErrorString::new(format!(
                            "no linked notebook registered for guid {guid}"
                        )))
                    })?;
                if ln.is_public() {
                    return Ok(AuthToken::new(""));
                }
                let data = self
                    .broker
                    .linked_notebook_auth(&ln)
                    .await
                    .map_err(|e| auth_error("failed to obtain a linked notebook token", e))?;
                let token = data.token.clone();
                self.linked_tokens.write().await.insert(guid.clone(), data);
                Ok(token)
            }
        }
    }

    /// Handles an `AUTH_EXPIRED` response for `scope`.
    ///
    /// The user scope refreshes the single primary token; a linked scope
    /// refreshes the tokens of *all* linked notebooks at once, because the
    /// service expires them together.
    pub async fn refresh_for(
        &self,
        scope: &Scope,
        emitter: &EventEmitter,
    ) -> Result<(), SyncError> {
        match scope {
            Scope::UserOwn => {
                info!("User auth token expired, requesting a fresh one");
                emitter.emit(SyncEvent::RequestAuthenticationToken);
                let token = self
                    .broker
                    .refresh_user_auth_token()
                    .await
                    .map_err(|e| auth_error("failed to refresh the user's auth token", e))?;
                *self.user_token.write().await = Some(token);
                Ok(())
            }
            Scope::LinkedNotebook(_) => {
                let all: Vec<LinkedNotebook> = self
                    .linked_notebooks
                    .read()
                    .await
                    .values()
                    .filter(|ln| !ln.is_public())
                    .cloned()
                    .collect();
                self.refresh_linked(&all, emitter).await
            }
        }
    }

    /// Refreshes any linked-notebook token within
    /// [`TOKEN_EXPIRY_MARGIN_MINUTES`] of expiry before linked-notebook
    /// sync starts.
    pub async fn refresh_expiring_linked_tokens(
        &self,
        emitter: &EventEmitter,
    ) -> Result<(), SyncError> {
        let margin = chrono::Duration::minutes(TOKEN_EXPIRY_MARGIN_MINUTES);
        let expiring: Vec<LinkedNotebook> = {
            let tokens = self.linked_tokens.read().await;
            let notebooks = self.linked_notebooks.read().await;
            notebooks
                .iter()
                .filter(|(guid, ln)| {
                    !ln.is_public()
                        && tokens
                            .get(*guid)
                            .map(|data| data.expires_within(margin))
                            .unwrap_or(false)
                })
                .map(|(_, ln)| ln.clone())
                .collect()
        };
        if expiring.is_empty() {
            return Ok(());
        }
        info!(
            count = expiring.len(),
            "Linked notebook tokens close to expiry, refreshing in bulk"
        );
        self.refresh_linked(&expiring, emitter).await
    }

    async fn refresh_linked(
        &self,
        linked_notebooks: &[LinkedNotebook],
        emitter: &EventEmitter,
    ) -> Result<(), SyncError> {
        if linked_notebooks.is_empty() {
            return Ok(());
        }
        emitter.emit(SyncEvent::RequestAuthenticationTokensForLinkedNotebooks {
            linked_notebooks: linked_notebooks.to_vec(),
        });
        let refreshed = self
            .broker
            .refresh_linked_notebook_auth(linked_notebooks)
            .await
            .map_err(|e| auth_error("failed to refresh linked notebook tokens", e))?;
        let mut tokens = self.linked_tokens.write().await;
        for (guid, data) in refreshed {
            tokens.insert(guid, data);
        }
        Ok(())
    }
}

fn auth_error(base: &str, err: anyhow::Error) -> SyncError {
    SyncError::Auth(ErrorString::new(base).with_details(format!("{err:#}")))
}

// ============================================================================
// RemoteCaller
// ============================================================================

/// Wraps remote calls with rate-limit and auth-expiry handling.
#[derive(Clone)]
pub struct RemoteCaller {
    auth: Arc<AuthState>,
    emitter: EventEmitter,
    cancel: CancellationToken,
}

impl RemoteCaller {
    pub fn new(auth: Arc<AuthState>, emitter: EventEmitter, cancel: CancellationToken) -> Self {
        Self {
            auth,
            emitter,
            cancel,
        }
    }

    /// Access to the shared auth state
    pub fn auth(&self) -> &Arc<AuthState> {
        &self.auth
    }

    /// Runs `f` against the remote service under `scope`'s token,
    /// retrying through rate limits and token refreshes until the call
    /// yields a terminal outcome.
    pub async fn call<T, F, Fut>(
        &self,
        scope: &Scope,
        operation: &str,
        f: F,
    ) -> Result<T, SyncError>
    where
        F: Fn(AuthToken) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let mut auth_attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Stopped);
            }

            let token = self.auth.token_for(scope).await?;
            match f(token).await {
                Ok(value) => return Ok(value),
                Err(RemoteError::RateLimitReached { duration_seconds }) => {
                    if duration_seconds < 0 {
                        return Err(SyncError::DataShape(
                            ErrorString::new(
                                "the service reported a negative rate limit duration",
                            )
                            .with_details(format!("operation {operation}: {duration_seconds}")),
                        ));
                    }
                    warn!(
                        operation,
                        seconds = duration_seconds,
                        "Rate limit reached, scheduling retry"
                    );
                    self.emitter.emit(SyncEvent::RateLimitExceeded {
                        seconds: duration_seconds,
                    });
                    self.sleep(Duration::from_secs(duration_seconds as u64))
                        .await?;
                    auth_attempts = 0;
                }
                Err(RemoteError::AuthExpired) => {
                    auth_attempts += 1;
                    if auth_attempts > MAX_AUTH_RETRIES {
                        return Err(SyncError::Auth(
                            ErrorString::new("refreshed auth token was rejected by the service")
                                .with_details(format!("operation {operation}")),
                        ));
                    }
                    debug!(operation, attempt = auth_attempts, "Auth token expired");
                    self.auth.refresh_for(scope, &self.emitter).await?;
                }
                Err(RemoteError::DataShape(error)) => {
                    return Err(SyncError::DataShape(error));
                }
                Err(RemoteError::Api(error)) => {
                    return Err(SyncError::Remote(error));
                }
            }
        }
    }

    /// Sleeps, waking early (with `Stopped`) when the session is
    /// cancelled.
    async fn sleep(&self, duration: Duration) -> Result<(), SyncError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Stopped),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
