//! Push channel: the long-lived WebSocket the cloud uses to announce
//! state changes between polls.
//!
//! The server speaks a socket.io-flavoured framing where every text frame
//! is `<numeric code><payload>`. The channel splits off the code and
//! broadcasts a [`PushEvent`] per frame; deciding what a code means is
//! left to the subscriber. Reconnection uses a fixed delay and keeps
//! going until [`PushChannel::stop`] is called (or an optional retry
//! limit is reached).
//!
//! # Example
//!
//! ```rust,ignore
//! use shsec_api::push::{PushChannel, PushConfig};
//! use shsec_api::Endpoints;
//! use tokio::sync::broadcast;
//!
//! let (tx, mut rx) = broadcast::channel(64);
//! let channel = PushChannel::start(Endpoints::default(), token, PushConfig::default(), tx);
//!
//! while let Ok(event) = rx.recv().await {
//!     if event.triggers_refresh() {
//!         // poll panel/cycle
//!     }
//! }
//!
//! channel.stop();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message, protocol::frame::coding::CloseCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::Endpoints;

// ── Frame codes ──────────────────────────────────────────────────────

/// Application-level heartbeat sent upstream after every transport pong.
pub const CODE_KEEPALIVE: &str = "2";
/// Server acknowledgement of a heartbeat.
pub const CODE_HEARTBEAT_ACK: &str = "3";
/// Application event; the panel state changed.
pub const CODE_EVENT: &str = "42";

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

// ── ChannelId ────────────────────────────────────────────────────────

/// Identity of one [`PushChannel`] instance.
///
/// Every event carries the id of the channel that produced it, so a
/// late `Disconnected` from a replaced channel can be told apart from
/// one sent by its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push-{}", self.0)
    }
}

// ── Frame ────────────────────────────────────────────────────────────

/// A text frame split into its numeric code and the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: String,
    pub payload: String,
}

impl Frame {
    /// Split a frame such as `42["update",{}]` into `("42", "[\"update\",{}]")`.
    ///
    /// Returns `None` when the frame does not start with a digit.
    pub fn parse(text: &str) -> Option<Self> {
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        if split == 0 {
            return None;
        }
        let (code, payload) = text.split_at(split);
        Some(Self {
            code: code.to_owned(),
            payload: payload.to_owned(),
        })
    }

    pub fn is_event(&self) -> bool {
        self.code == CODE_EVENT
    }

    pub fn is_heartbeat_ack(&self) -> bool {
        self.code == CODE_HEARTBEAT_ACK
    }
}

// ── PushEvent ────────────────────────────────────────────────────────

/// Everything the push channel reports to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The WebSocket handshake completed.
    Connected { channel: ChannelId },
    /// A text frame arrived. Unknown codes are delivered too.
    Frame { channel: ChannelId, frame: Frame },
    /// A transport error; the loop keeps retrying.
    Error { channel: ChannelId, message: String },
    /// The run loop exited. The channel will not reconnect.
    Disconnected { channel: ChannelId },
}

impl PushEvent {
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::Connected { channel }
            | Self::Frame { channel, .. }
            | Self::Error { channel, .. }
            | Self::Disconnected { channel } => *channel,
        }
    }

    /// Whether this event means the panel state should be polled again.
    pub fn triggers_refresh(&self) -> bool {
        matches!(self, Self::Frame { frame, .. } if frame.is_event())
    }
}

// ── PushConfig ───────────────────────────────────────────────────────

/// Timing for the push channel.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Interval between transport-level pings. Default: 10s.
    pub ping_interval: Duration,

    /// Fixed pause between reconnection attempts. Default: 10s.
    pub reconnect_delay: Duration,

    /// Consecutive failed attempts tolerated before the loop gives up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(10),
            max_retries: None,
        }
    }
}

// ── PushChannel ──────────────────────────────────────────────────────

/// Handle to a running push channel task.
///
/// Dropping the handle stops the channel.
pub struct PushChannel {
    id: ChannelId,
    cancel: CancellationToken,
    token_tx: watch::Sender<SecretString>,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// Spawn the connection loop and return immediately.
    ///
    /// Events are published on `events`; sending never blocks and is
    /// silently skipped when nobody is subscribed.
    pub fn start(
        endpoints: Endpoints,
        token: SecretString,
        config: PushConfig,
        events: broadcast::Sender<PushEvent>,
    ) -> Self {
        let id = ChannelId::next();
        let cancel = CancellationToken::new();
        let (token_tx, token_rx) = watch::channel(token);

        debug!(channel = %id, "starting push channel");
        let task = tokio::spawn(push_loop(
            id,
            endpoints,
            token_rx,
            config,
            events,
            cancel.clone(),
        ));

        Self {
            id,
            cancel,
            token_tx,
            task: Some(task),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Hand a fresh session token to the channel. It is used from the
    /// next (re)connection on.
    pub fn update_token(&self, token: SecretString) {
        self.token_tx.send_replace(token);
    }

    /// Request shutdown. Closes the socket and ends the loop; calling it
    /// again has no further effect.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!(channel = %self.id, "stopping push channel");
            self.cancel.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `true` until the channel is stopped or its loop has exited.
    pub fn is_running(&self) -> bool {
        !self.is_stopped() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait for the background task to finish. Does not stop it.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(channel = %self.id, error = %e, "push channel task failed");
            }
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushChannel")
            .field("id", &self.id)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

// ── PushSlot ─────────────────────────────────────────────────────────

/// Owner of the single current push channel of a session.
///
/// Installing a channel always stops the previous one first, and
/// releasing is keyed by [`ChannelId`] so a stale channel can never
/// evict its replacement.
#[derive(Debug, Default)]
pub struct PushSlot {
    current: Option<PushChannel>,
}

impl PushSlot {
    pub fn current(&self) -> Option<&PushChannel> {
        self.current.as_ref()
    }

    /// `true` if a channel is installed and still running.
    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(PushChannel::is_running)
    }

    /// Install `next`, stopping and returning the previous channel.
    pub fn replace(&mut self, next: PushChannel) -> Option<PushChannel> {
        let previous = self.current.replace(next);
        if let Some(ref prev) = previous {
            prev.stop();
        }
        previous
    }

    /// Remove the current channel if it is `id`. Returns the removed
    /// (stopped) channel, or `None` when `id` is no longer current.
    pub fn release(&mut self, id: ChannelId) -> Option<PushChannel> {
        if self.current.as_ref().is_some_and(|c| c.id() == id) {
            self.stop()
        } else {
            None
        }
    }

    /// Stop and remove whatever channel is installed.
    pub fn stop(&mut self) -> Option<PushChannel> {
        let channel = self.current.take()?;
        channel.stop();
        Some(channel)
    }
}

// ── Background connection loop ──────────────────────────────────────

/// Main loop: connect → read → on drop, wait `reconnect_delay` → reconnect.
async fn push_loop(
    id: ChannelId,
    endpoints: Endpoints,
    token_rx: watch::Receiver<SecretString>,
    config: PushConfig,
    events: broadcast::Sender<PushEvent>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        let url = endpoints.push_url(token_rx.borrow().expose_secret());

        // Cancellation is handled inside so the socket gets a close frame
        match connect_and_read(id, &url, &config, &events, &cancel).await {
            Ok(()) => {
                failures = 0;
            }
            Err(e @ Error::WebSocketClosed { .. }) => {
                // The connection was up, so this is not a failed attempt
                failures = 0;
                info!(channel = %id, error = %e, "push channel dropped");
                let _ = events.send(PushEvent::Error {
                    channel: id,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!(channel = %id, error = %e, failures, "push channel error");
                let _ = events.send(PushEvent::Error {
                    channel: id,
                    message: e.to_string(),
                });

                failures = failures.saturating_add(1);
                if config.max_retries.is_some_and(|max| failures > max) {
                    error!(channel = %id, failures, "push channel retry limit reached, giving up");
                    break;
                }
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        trace!(channel = %id, delay_ms = config.reconnect_delay.as_millis(), "waiting before reconnect");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    debug!(channel = %id, "push loop exiting");
    let _ = events.send(PushEvent::Disconnected { channel: id });
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and pump frames until it drops.
///
/// Returns `Ok(())` on cancellation or when the stream simply ends. A
/// server close or a transport failure on the open socket comes back
/// as [`Error::WebSocketClosed`].
async fn connect_and_read(
    id: ChannelId,
    url: &Url,
    config: &PushConfig,
    events: &broadcast::Sender<PushEvent>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    // The query string carries the session token; keep it out of logs.
    debug!(channel = %id, host = url.host_str().unwrap_or_default(), path = url.path(), "connecting push channel");

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        connected = tokio_tungstenite::connect_async(url.as_str()) => {
            connected.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };

    info!(channel = %id, "push channel connected");
    let _ = events.send(PushEvent::Connected { channel: id });

    let (mut write, mut read) = ws_stream.split();

    let mut ping = tokio::time::interval(config.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(channel = %id, error = %e, "close frame not sent");
                }
                return Ok(());
            }
            _ = ping.tick() => {
                write
                    .send(Message::Ping(Default::default()))
                    .await
                    .map_err(dropped)?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_text(id, &text, events);
                    }
                    Some(Ok(Message::Pong(_))) => {
                        trace!(channel = %id, "pong received, sending keepalive");
                        write
                            .send(Message::text(CODE_KEEPALIVE))
                            .await
                            .map_err(dropped)?;
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite queues the pong reply itself
                        trace!(channel = %id, "ping received");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (u16::from(CloseCode::Status), String::new()),
                            |cf| (u16::from(cf.code), cf.reason.to_string()),
                        );
                        return Err(Error::WebSocketClosed { code, reason });
                    }
                    Some(Err(e)) => {
                        return Err(dropped(e));
                    }
                    None => {
                        info!(channel = %id, "push stream ended");
                        return Ok(());
                    }
                    Some(Ok(_)) => {
                        // Binary and raw frames are not part of the protocol
                    }
                }
            }
        }
    }
}

/// A transport failure on an established socket: abnormal closure.
fn dropped(e: tungstenite::Error) -> Error {
    Error::WebSocketClosed {
        code: u16::from(CloseCode::Abnormal),
        reason: e.to_string(),
    }
}

/// Parse a text frame and broadcast it.
fn dispatch_text(id: ChannelId, text: &str, events: &broadcast::Sender<PushEvent>) {
    let Some(frame) = Frame::parse(text) else {
        debug!(channel = %id, text, "dropping frame without numeric code");
        return;
    };

    debug!(channel = %id, code = %frame.code, payload = %frame.payload, "push frame");
    // Ignore send errors -- just means no active subscribers right now
    let _ = events.send(PushEvent::Frame { channel: id, frame });
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unreachable_endpoints() -> Endpoints {
        // Port 9 (discard) on loopback is closed on any sane test host.
        Endpoints::new("http://127.0.0.1:9/REST/v2/", "ws://127.0.0.1:9/ws/socket.io/").unwrap()
    }

    fn fast_config() -> PushConfig {
        PushConfig {
            ping_interval: Duration::from_millis(50),
            reconnect_delay: Duration::from_millis(20),
            max_retries: None,
        }
    }

    fn start_unreachable(events: broadcast::Sender<PushEvent>) -> PushChannel {
        PushChannel::start(
            unreachable_endpoints(),
            SecretString::from("tok".to_string()),
            fast_config(),
            events,
        )
    }

    #[test]
    fn parse_event_frame() {
        let frame = Frame::parse(r#"42{"foo":1}"#).unwrap();
        assert_eq!(frame.code, "42");
        assert_eq!(frame.payload, r#"{"foo":1}"#);
        assert!(frame.is_event());
    }

    #[test]
    fn parse_heartbeat_ack() {
        let frame = Frame::parse("3").unwrap();
        assert_eq!(frame.code, "3");
        assert_eq!(frame.payload, "");
        assert!(frame.is_heartbeat_ack());
        assert!(!frame.is_event());
    }

    #[test]
    fn parse_rejects_frames_without_code() {
        assert!(Frame::parse("").is_none());
        assert!(Frame::parse(r#"{"foo":1}"#).is_none());
    }

    #[test]
    fn only_event_frames_trigger_refresh() {
        let channel = ChannelId::next();
        let event = PushEvent::Frame {
            channel,
            frame: Frame::parse(r#"42{"foo":1}"#).unwrap(),
        };
        let ack = PushEvent::Frame {
            channel,
            frame: Frame::parse("3").unwrap(),
        };
        let open = PushEvent::Frame {
            channel,
            frame: Frame::parse(r#"0{"sid":"x"}"#).unwrap(),
        };

        assert!(event.triggers_refresh());
        assert!(!ack.triggers_refresh());
        assert!(!open.triggers_refresh());
        assert!(!PushEvent::Connected { channel }.triggers_refresh());
    }

    #[test]
    fn dispatch_delivers_unknown_codes() {
        let (tx, mut rx) = broadcast::channel(8);
        let id = ChannelId::next();

        dispatch_text(id, "40", &tx);
        dispatch_text(id, "not a frame", &tx);

        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            PushEvent::Frame {
                channel: id,
                frame: Frame {
                    code: "40".into(),
                    payload: String::new()
                }
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_ids_are_unique() {
        assert_ne!(ChannelId::next(), ChannelId::next());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (tx, mut rx) = broadcast::channel(64);
        let mut channel = start_unreachable(tx);

        channel.stop();
        channel.stop();
        assert!(channel.is_stopped());
        assert!(!channel.is_running());

        tokio::time::timeout(Duration::from_secs(5), channel.finished())
            .await
            .unwrap();

        // Exactly one Disconnected, whatever errors preceded it
        let mut disconnects = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PushEvent::Disconnected { .. }) {
                disconnects += 1;
            }
        }
        assert_eq!(disconnects, 1);

        channel.stop();
        assert!(channel.is_stopped());
    }

    #[tokio::test]
    async fn connection_errors_are_reported_and_retried() {
        let (tx, mut rx) = broadcast::channel(64);
        let channel = start_unreachable(tx);

        let mut errors = 0;
        while errors < 2 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            match event {
                PushEvent::Error { channel: id, .. } => {
                    assert_eq!(id, channel.id());
                    errors += 1;
                }
                PushEvent::Disconnected { .. } => panic!("loop must keep retrying"),
                _ => {}
            }
        }

        assert!(channel.is_running());
        channel.stop();
    }

    #[tokio::test]
    async fn retry_limit_ends_the_loop() {
        let (tx, mut rx) = broadcast::channel(64);
        let mut config = fast_config();
        config.max_retries = Some(0);
        let mut channel = PushChannel::start(
            unreachable_endpoints(),
            SecretString::from("tok".to_string()),
            config,
            tx,
        );

        tokio::time::timeout(Duration::from_secs(5), channel.finished())
            .await
            .unwrap();

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(PushEvent::Disconnected { channel: channel.id() }));
        assert!(!channel.is_running());
    }

    #[tokio::test]
    async fn slot_replacement_leaves_one_active_channel() {
        let (tx, _rx) = broadcast::channel(64);
        let mut slot = PushSlot::default();

        let first = start_unreachable(tx.clone());
        let first_id = first.id();
        assert!(slot.replace(first).is_none());
        assert!(slot.is_active());

        let second = start_unreachable(tx);
        let second_id = second.id();
        let previous = slot.replace(second).unwrap();

        assert_eq!(previous.id(), first_id);
        assert!(previous.is_stopped());
        assert_eq!(slot.current().unwrap().id(), second_id);
        assert!(slot.is_active());

        // A late release from the replaced channel must not evict the new one
        assert!(slot.release(first_id).is_none());
        assert_eq!(slot.current().unwrap().id(), second_id);

        let released = slot.release(second_id).unwrap();
        assert!(released.is_stopped());
        assert!(slot.current().is_none());
        assert!(!slot.is_active());
    }

    #[tokio::test]
    async fn slot_stop_twice_matches_stop_once() {
        let (tx, _rx) = broadcast::channel(64);
        let mut slot = PushSlot::default();
        slot.replace(start_unreachable(tx));

        let stopped = slot.stop().unwrap();
        assert!(stopped.is_stopped());
        assert!(slot.stop().is_none());
        assert!(slot.current().is_none());
        assert!(!slot.is_active());
    }
}
