// ── Coordinator ──
//
// Full lifecycle management for one SmartHomeSec installation.
// Handles login, the periodic and push-triggered poll, command routing,
// and publishes every poll result through the DataStore.

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use shsec_api::transport::{TlsMode, TransportConfig};
use shsec_api::{Credentials, Endpoints, PushConfig, PushEvent, SessionClient};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::{CoordinatorConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{AlarmMode, AlarmPanel, BinarySensor};
use crate::store::{DataStore, Snapshot};

const COMMAND_CHANNEL_SIZE: usize = 16;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Owns the session
/// client, the background poll loop, the push-event bridge and the
/// command processor. A coordinator is connected once; after
/// [`disconnect()`](Self::disconnect) create a new one.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    store: Arc<DataStore>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    // Capacity 1: a pending request absorbs any that arrive after it.
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
    cancel: CancellationToken,
    client: Mutex<Option<Arc<SessionClient>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a new Coordinator from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to log in and start background tasks.
    pub fn new(config: CoordinatorConfig) -> Self {
        let store = Arc::new(DataStore::new());
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                store,
                connection_state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                refresh_tx,
                refresh_rx: Mutex::new(Some(refresh_rx)),
                cancel: CancellationToken::new(),
                client: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the installation.
    ///
    /// Logs in, performs the first poll, and spawns background tasks
    /// (periodic refresh, push bridge, command processor). A login
    /// failure leaves the coordinator in [`ConnectionState::Failed`].
    pub async fn connect(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Internal(
                "coordinator was disconnected; create a new one".into(),
            ));
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let client = match build_session_client(&self.inner.config) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(e);
            }
        };

        // Subscribe before login so the first push events are not missed
        let push_events = client.subscribe();

        if let Err(e) = client.login().await {
            warn!(error = %e, "login failed");
            client.shutdown();
            self.inner.connection_state.send_replace(ConnectionState::Failed);
            return Err(e.into());
        }
        debug!("login successful");

        *self.inner.client.lock().await = Some(Arc::clone(&client));

        // Initial data load
        if let Err(e) = self.refresh().await {
            client.shutdown();
            *self.inner.client.lock().await = None;
            self.inner.connection_state.send_replace(ConnectionState::Failed);
            return Err(e);
        }

        // Spawn background tasks
        let mut handles = self.inner.task_handles.lock().await;
        let cancel = self.inner.cancel.clone();

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            handles.push(tokio::spawn(command_processor_task(self.clone(), rx)));
        }

        if let Some(rx) = self.inner.refresh_rx.lock().await.take() {
            handles.push(tokio::spawn(refresh_task(
                self.clone(),
                self.inner.config.refresh_interval_secs,
                rx,
                cancel.clone(),
            )));
        }

        if self.inner.config.push_enabled {
            handles.push(tokio::spawn(push_bridge_task(
                self.clone(),
                client,
                push_events,
                cancel,
            )));
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(installation = %self.inner.config.name, "connected");
        Ok(())
    }

    /// Disconnect.
    ///
    /// Cancels background tasks, stops the push channel, forgets the
    /// session and resets the state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        // Join all background tasks
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        if let Some(client) = self.inner.client.lock().await.take() {
            client.shutdown();
        }

        self.inner.store.clear();
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Poll the panel once and publish the result.
    ///
    /// Bounded by `refresh_timeout`. On failure the previous data stays
    /// in the store but is marked unavailable, and the cause comes back
    /// wrapped in [`CoreError::RefreshFailed`].
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        let timeout = self.inner.config.refresh_timeout;

        let polled = match tokio::time::timeout(timeout, client.panel_cycle()).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => {
                if e.is_transient() {
                    warn!(error = %e, status = ?e.status(), "poll failed, retrying next cycle");
                } else {
                    error!(error = %e, status = ?e.status(), "poll failed");
                }
                Err(CoreError::from(e))
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "poll timed out");
                Err(CoreError::Timeout {
                    timeout_secs: timeout.as_secs(),
                })
            }
        };

        match polled {
            Ok(status) => {
                let devices = status.device_status.into_iter().map(Into::into).collect();
                let areas = status.model.into_iter().map(Into::into).collect();
                self.inner.store.apply_refresh(devices, areas);

                debug!(
                    devices = self.inner.store.device_count(),
                    areas = self.inner.store.area_count(),
                    "data refresh complete"
                );
                Ok(())
            }
            Err(e) => {
                self.inner.store.mark_unavailable(e.to_string());
                Err(CoreError::RefreshFailed(Box::new(e)))
            }
        }
    }

    /// Ask the background loop to poll as soon as possible. Requests
    /// arriving while one is pending are merged into it.
    pub fn request_refresh(&self) {
        if self.inner.refresh_tx.try_send(()).is_err() {
            trace!("refresh already pending");
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Change an area's arming mode.
    ///
    /// Area and pin must be numeric. The snapshot is not touched; the new
    /// mode shows up with the next poll.
    pub async fn set_mode(
        &self,
        area: &str,
        mode: AlarmMode,
        pin: &str,
    ) -> Result<serde_json::Value, CoreError> {
        if !mode.is_settable() {
            return Err(CoreError::ValidationFailed {
                message: format!("mode '{mode}' cannot be requested"),
            });
        }
        let area_num = parse_numeric("area", area)?;
        let pin_num = parse_numeric("code", pin)?;

        let client = self.client().await?;
        info!(area, %mode, "setting alarm mode");
        Ok(client.set_panel_mode(area_num, mode.into(), pin_num).await?)
    }

    /// Execute a command.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::NotConnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::NotConnected)?;

        rx.await.map_err(|_| CoreError::NotConnected)?
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Disables the push channel and periodic refresh since only a
    /// single request-response cycle is needed.
    pub async fn oneshot<F, Fut, T>(config: CoordinatorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.push_enabled = false;
        cfg.refresh_interval_secs = 0;

        let coordinator = Coordinator::new(cfg);
        coordinator.connect().await?;
        let result = f(coordinator.clone()).await;
        coordinator.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.store.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    // ── Entity views ─────────────────────────────────────────────

    /// Binary sensors for every door contact and motion detector.
    pub fn binary_sensors(&self) -> Vec<BinarySensor> {
        let snap = self.snapshot();
        snap.devices
            .values()
            .filter_map(|d| BinarySensor::from_device(d, snap.available))
            .collect()
    }

    /// Alarm panels for the configured areas present in the snapshot.
    pub fn alarm_panels(&self) -> Vec<AlarmPanel> {
        let snap = self.snapshot();
        let config = &self.inner.config;
        snap.areas
            .values()
            .filter(|a| config.alarm_areas.iter().any(|id| *id == a.id))
            .map(|a| AlarmPanel::from_area(&config.name, a, snap.available))
            .collect()
    }

    async fn client(&self) -> Result<Arc<SessionClient>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::NotConnected)
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll on a fixed interval and whenever a refresh is requested.
async fn refresh_task(
    coordinator: Coordinator,
    interval_secs: u64,
    mut requests: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let periodic = interval_secs > 0;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            request = requests.recv() => {
                if request.is_none() {
                    break;
                }
                debug!("on-demand refresh");
                if let Err(e) = coordinator.refresh().await {
                    debug!(error = %e, "requested refresh failed");
                }
            }
            _ = interval.tick(), if periodic => {
                if let Err(e) = coordinator.refresh().await {
                    debug!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Translate push channel events into refresh requests and channel
/// bookkeeping.
async fn push_bridge_task(
    coordinator: Coordinator,
    client: Arc<SessionClient>,
    mut events: broadcast::Receiver<PushEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => handle_push_event(&coordinator, &client, event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push bridge lagged, refreshing");
                    coordinator.request_refresh();
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

fn handle_push_event(coordinator: &Coordinator, client: &SessionClient, event: PushEvent) {
    match event {
        PushEvent::Frame { frame, .. } if frame.is_event() => {
            info!(payload = %frame.payload, "push event, refreshing");
            coordinator.request_refresh();
        }
        PushEvent::Frame { frame, .. } if frame.is_heartbeat_ack() => {
            trace!("heartbeat acknowledged");
        }
        PushEvent::Frame { frame, channel } => {
            debug!(%channel, code = %frame.code, "unhandled push frame");
        }
        PushEvent::Connected { channel } => {
            info!(%channel, "push channel connected");
        }
        PushEvent::Error { channel, message } => {
            warn!(%channel, error = %message, "push channel error");
        }
        PushEvent::Disconnected { channel } => {
            if client.release_push_channel(channel) {
                info!(%channel, "push channel gone, a new one starts with the next login");
            }
        }
    }
}

/// Process commands from the mpsc channel.
async fn command_processor_task(coordinator: Coordinator, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = coordinator.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&coordinator, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(coordinator: &Coordinator, cmd: Command) -> Result<CommandResult, CoreError> {
    let mode = cmd.target_mode();
    match cmd {
        Command::Refresh => {
            coordinator.refresh().await?;
            Ok(CommandResult::Ok)
        }

        Command::ArmAway { area, code }
        | Command::ArmHome { area, code }
        | Command::Disarm { area, code } => {
            let mode = mode.ok_or_else(|| CoreError::Internal("alarm command without mode".into()))?;
            let code = code
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| CoreError::ValidationFailed {
                    message: "a code is required to arm or disarm".into(),
                })?;

            if coordinator.inner.store.area(&area).is_none() {
                return Err(CoreError::AreaNotFound { area });
            }

            let ack = coordinator.set_mode(&area, mode, &code).await?;
            Ok(CommandResult::Acknowledged(ack))
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_session_client(config: &CoordinatorConfig) -> Result<SessionClient, CoreError> {
    let endpoints = Endpoints::new(config.rest_url.as_str(), config.push_url.as_str())?;
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    };
    let credentials = Credentials::new(config.username.clone(), config.password.clone());

    let client = SessionClient::new(credentials, endpoints, &transport)?;
    Ok(if config.push_enabled {
        client.with_push_channel(PushConfig {
            ping_interval: config.push_ping_interval,
            reconnect_delay: config.push_reconnect_delay,
            max_retries: None,
        })
    } else {
        client
    })
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

/// Area ids and pincodes travel as integers.
fn parse_numeric(field: &str, value: &str) -> Result<u32, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::ValidationFailed {
            message: format!("{field} must be numeric"),
        })
}
