// Session-aware HTTP client for the SmartHomeSec REST API
//
// Owns the login state, assembles the hand-rolled auth cookie and `token`
// header on every call, and re-authenticates when the server answers 401.
// Typed endpoints live in `panel.rs` as inherent methods so this module
// stays focused on transport mechanics.

use std::sync::{Mutex, RwLock};

use chrono::Utc;
use reqwest::header::COOKIE;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, LoginResponse, Session};
use crate::error::Error;
use crate::push::{ChannelId, PushChannel, PushConfig, PushEvent, PushSlot};
use crate::transport::{Endpoints, TransportConfig};

/// Re-logins attempted for one request before giving up. With the
/// initial attempt this bounds a request to three round-trips.
const MAX_RELOGINS: u32 = 2;

/// Cookie sent with the unauthenticated login request.
const LOGIN_COOKIE: &str = "isPrivacy=1;";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Authenticated client for one SmartHomeSec account.
///
/// Logs in lazily on the first request, keeps the token in memory, and
/// optionally owns the account's push channel. The type is `Send + Sync`;
/// wrap it in an `Arc` to share between tasks.
pub struct SessionClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Credentials,
    session: RwLock<Session>,
    push: Mutex<PushSlot>,
    push_config: Option<PushConfig>,
    events: broadcast::Sender<PushEvent>,
}

impl SessionClient {
    /// Create a client with its own `reqwest::Client` built from `transport`.
    pub fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, credentials, endpoints))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, credentials: Credentials, endpoints: Endpoints) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http,
            endpoints,
            credentials,
            session: RwLock::new(Session::default()),
            push: Mutex::new(PushSlot::default()),
            push_config: None,
            events,
        }
    }

    /// Enable the push channel. It is started by the next successful
    /// login and kept alive with `config`.
    #[must_use]
    pub fn with_push_channel(mut self, config: PushConfig) -> Self {
        self.push_config = Some(config);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.read().expect("session lock poisoned").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .expect("session lock poisoned")
            .is_authenticated()
    }

    /// Subscribe to events from this session's push channel(s).
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange the credentials for a token and user id.
    ///
    /// On success the push channel (if enabled) is started, or handed the
    /// fresh token when one is already running.
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.endpoints.rest_url("auth/login")?;
        debug!(username = %self.credentials.username, "logging in");

        let resp = self
            .http
            .post(url)
            .header(COOKIE, LOGIN_COOKIE)
            .form(&self.credentials.login_form())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::Authentication {
                message: format!("login rejected (HTTP {})", status.as_u16()),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let login: LoginResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("unexpected login response: {e}"),
            })?;

        let token = SecretString::from(login.token.clone());
        self.session
            .write()
            .expect("session lock poisoned")
            .establish(login.token, login.data.user_id);

        info!(username = %self.credentials.username, "logged in");
        self.attach_push_channel(token);
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET of a REST path, decoded from JSON.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.execute(Method::GET, path, None::<&()>).await
    }

    /// Authenticated form-encoded POST of a REST path, decoded from JSON.
    ///
    /// A 400 answer is reported as [`Error::Security`] and not retried.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &(impl Serialize + ?Sized),
    ) -> Result<T, Error> {
        self.execute(Method::POST, path, Some(form)).await
    }

    async fn execute<T, B>(&self, method: Method, path: &str, form: Option<&B>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoints.rest_url(path)?;
        let mut relogins = 0;

        loop {
            let (cookie, token) = match self.auth_headers() {
                Some(headers) => headers,
                None => {
                    self.login().await?;
                    self.auth_headers().ok_or_else(|| Error::Authentication {
                        message: "session cleared during login".into(),
                    })?
                }
            };

            debug!("{method} {url}");
            let mut req = self
                .http
                .request(method.clone(), url.clone())
                .query(&[("_", Utc::now().timestamp_millis())])
                .header(COOKIE, cookie)
                .header("token", token);
            if let Some(form) = form {
                req = req.form(form);
            }

            let resp = req.send().await.map_err(Error::Transport)?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                self.session
                    .write()
                    .expect("session lock poisoned")
                    .invalidate();

                if relogins >= MAX_RELOGINS {
                    return Err(Error::Api {
                        status: status.as_u16(),
                        message: format!("{path} still unauthorized after {relogins} re-logins"),
                    });
                }
                relogins += 1;
                warn!(path, attempt = relogins, "session rejected, logging in again");
                self.login().await?;
                continue;
            }

            let body = resp.text().await.map_err(Error::Transport)?;

            if status == StatusCode::BAD_REQUEST && method == Method::POST {
                return Err(Error::Security {
                    message: snippet(&body),
                });
            }
            if status != StatusCode::OK {
                return Err(Error::Api {
                    status: status.as_u16(),
                    message: snippet(&body),
                });
            }

            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("{path}: {e}"),
                body,
            });
        }
    }

    /// Cookie and `token` header values, or `None` when logged out.
    fn auth_headers(&self) -> Option<(String, String)> {
        let session = self.session.read().expect("session lock poisoned");
        let cookie = session.cookie_header()?;
        let token = session.token()?.expose_secret().to_owned();
        Some((cookie, token))
    }

    // ── Push channel ─────────────────────────────────────────────────

    fn attach_push_channel(&self, token: SecretString) {
        let Some(config) = &self.push_config else {
            return;
        };

        let mut slot = self.push.lock().expect("push slot lock poisoned");
        if let Some(current) = slot.current().filter(|_| slot.is_active()) {
            debug!(channel = %current.id(), "handing fresh token to running push channel");
            current.update_token(token);
            return;
        }

        let channel = PushChannel::start(
            self.endpoints.clone(),
            token,
            config.clone(),
            self.events.clone(),
        );
        debug!(channel = %channel.id(), "push channel attached");
        slot.replace(channel);
    }

    /// Start a new push channel with the current token, replacing (and
    /// stopping) any existing one. Uses the configured [`PushConfig`], or
    /// the default when the channel was not enabled.
    pub fn start_push_channel(&self) -> Result<ChannelId, Error> {
        let token = self
            .session
            .read()
            .expect("session lock poisoned")
            .token()
            .cloned()
            .ok_or_else(|| Error::Authentication {
                message: "cannot start push channel before login".into(),
            })?;

        let channel = PushChannel::start(
            self.endpoints.clone(),
            token,
            self.push_config.clone().unwrap_or_default(),
            self.events.clone(),
        );
        let id = channel.id();
        self.push.lock().expect("push slot lock poisoned").replace(channel);
        Ok(id)
    }

    /// Discard the channel `id` if it is still the current one. Returns
    /// `false` when a newer channel has already taken its place.
    pub fn release_push_channel(&self, id: ChannelId) -> bool {
        let released = self
            .push
            .lock()
            .expect("push slot lock poisoned")
            .release(id)
            .is_some();
        if released {
            debug!(channel = %id, "push channel released");
        }
        released
    }

    /// Id of the currently installed push channel, if any.
    pub fn push_channel_id(&self) -> Option<ChannelId> {
        self.push
            .lock()
            .expect("push slot lock poisoned")
            .current()
            .map(PushChannel::id)
    }

    pub fn is_push_active(&self) -> bool {
        self.push.lock().expect("push slot lock poisoned").is_active()
    }

    /// Stop the push channel, if any. Idempotent.
    pub fn stop_push_channel(&self) {
        if let Some(channel) = self.push.lock().expect("push slot lock poisoned").stop() {
            debug!(channel = %channel.id(), "push channel stopped");
        }
    }

    /// Stop the push channel and forget the session token.
    pub fn shutdown(&self) {
        self.stop_push_channel();
        self.session
            .write()
            .expect("session lock poisoned")
            .invalidate();
        debug!("session shut down");
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("endpoints", &self.endpoints)
            .field("username", &self.credentials.username)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// First 200 characters of a response body, for error messages.
fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(300);
        let s = snippet(&long);
        assert_eq!(s.len(), 203);
        assert!(s.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }
}
