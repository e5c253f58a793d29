//! The connection lifecycle state machine (§4.1).
//!
//! `Connection` is driven entirely by two entry points: [`Connection::poll`]
//! (called on a timer/animation-frame loop by the runtime, carrying the
//! current `performance.now()`) and the handler registration methods. It
//! never spawns its own timers — the same "pass `now_ms` in" shape used by
//! `minimact-hints`' `HintQueue`, chosen so the whole state machine is
//! exercised by ordinary synchronous unit tests.

use crate::error::TransportError;
use crate::socket::{Socket, SocketEvent};
use crate::state::ConnectionState;
use minimact_protocol::{parse_frame, split_frame, HandshakeRequest, HandshakeResponse, Message};
use serde_json::Value;
use std::collections::HashMap;

/// Fixed reconnect backoff schedule, in milliseconds (§4.1). The server
/// does not get to change this — see `reconnect_interval_ms` below.
const RECONNECT_BACKOFF_MS: &[f64] = &[0.0, 2_000.0, 10_000.0, 30_000.0];
const RECONNECT_BACKOFF_CEILING_MS: f64 = 60_000.0;

fn backoff_delay(attempt: usize) -> f64 {
    RECONNECT_BACKOFF_MS.get(attempt).copied().unwrap_or(RECONNECT_BACKOFF_CEILING_MS)
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub url: String,
    pub handshake_timeout_ms: f64,
    pub invocation_timeout_ms: f64,
    /// Accepted for wire/API compatibility but ignored: the backoff
    /// schedule is fixed (§4.1, Open Questions). Kept only so callers
    /// migrating a hand-rolled client don't get a compile error.
    #[deprecated(note = "reconnect backoff is fixed; this field has no effect")]
    pub reconnect_interval_ms: Option<f64>,
}

impl Default for ConnectionOptions {
    #[allow(deprecated)]
    fn default() -> Self {
        ConnectionOptions {
            url: String::new(),
            handshake_timeout_ms: 30_000.0,
            invocation_timeout_ms: 30_000.0,
            reconnect_interval_ms: None,
        }
    }
}

struct PendingInvocation {
    deadline_ms: f64,
    on_complete: Box<dyn FnOnce(Result<Option<Value>, TransportError>)>,
}

type TargetHandler = Box<dyn FnMut(&[Value])>;

/// A single SignalR-JSON-compatible connection over a [`Socket`].
pub struct Connection<S: Socket> {
    options: ConnectionOptions,
    socket: S,
    state: ConnectionState,
    handshake_acked: bool,
    handshake_deadline_ms: Option<f64>,
    reconnect_attempt: usize,
    reconnect_deadline_ms: Option<f64>,
    next_invocation_id: u64,
    pending: HashMap<String, PendingInvocation>,
    handlers: HashMap<String, Vec<TargetHandler>>,
    state_handlers: Vec<Box<dyn FnMut(ConnectionState, ConnectionState)>>,
}

impl<S: Socket> Connection<S> {
    pub fn new(options: ConnectionOptions, socket: S) -> Self {
        Connection {
            options,
            socket,
            state: ConnectionState::Disconnected,
            handshake_acked: false,
            handshake_deadline_ms: None,
            reconnect_attempt: 0,
            reconnect_deadline_ms: None,
            next_invocation_id: 0,
            pending: HashMap::new(),
            handlers: HashMap::new(),
            state_handlers: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Register a server→client method handler. Registrations are
    /// append-only and survive reconnects; only [`Connection::off`] removes
    /// them.
    pub fn on(&mut self, target: impl Into<String>, handler: impl FnMut(&[Value]) + 'static) {
        self.handlers.entry(target.into()).or_default().push(Box::new(handler));
    }

    pub fn off(&mut self, target: &str) {
        self.handlers.remove(target);
    }

    pub fn on_state_change(&mut self, handler: impl FnMut(ConnectionState, ConnectionState) + 'static) {
        self.state_handlers.push(Box::new(handler));
    }

    pub fn start(&mut self, now_ms: f64) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        self.reconnect_attempt = 0;
        self.begin_connect(now_ms);
    }

    /// Tear the connection down. Pending invocations are rejected with
    /// [`TransportError::Closed`] and no reconnect is scheduled.
    pub fn stop(&mut self) {
        self.socket.close();
        self.reconnect_deadline_ms = None;
        self.handshake_deadline_ms = None;
        self.fail_all_pending();
        self.transition(ConnectionState::Disconnected);
    }

    /// Fire-and-forget invocation: no id, no completion.
    pub fn send(&mut self, target: &str, arguments: Vec<Value>) -> Result<(), TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::Closed);
        }
        let message = Message::Invocation {
            invocation_id: None,
            target: target.to_string(),
            arguments,
        };
        self.socket.send(&message.encode())
    }

    /// Correlated invocation: resolves `on_complete` when the matching
    /// `Completion` arrives, or on timeout/close.
    pub fn invoke(
        &mut self,
        target: &str,
        arguments: Vec<Value>,
        now_ms: f64,
        on_complete: impl FnOnce(Result<Option<Value>, TransportError>) + 'static,
    ) -> Result<String, TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::Closed);
        }
        let invocation_id = self.next_invocation_id.to_string();
        self.next_invocation_id += 1;

        let message = Message::Invocation {
            invocation_id: Some(invocation_id.clone()),
            target: target.to_string(),
            arguments,
        };
        self.socket.send(&message.encode())?;
        self.pending.insert(
            invocation_id.clone(),
            PendingInvocation {
                deadline_ms: now_ms + self.options.invocation_timeout_ms,
                on_complete: Box::new(on_complete),
            },
        );
        Ok(invocation_id)
    }

    /// Drive the state machine forward: drains socket events, times out the
    /// handshake or pending invocations, and fires scheduled reconnects.
    pub fn poll(&mut self, now_ms: f64) {
        // Fire a reconnect scheduled by a *previous* poll before looking at
        // anything new, so a zero-delay backoff step still surfaces the
        // `Reconnecting` state to observers for one tick.
        if let Some(deadline) = self.reconnect_deadline_ms {
            if now_ms >= deadline {
                self.reconnect_deadline_ms = None;
                self.begin_connect(now_ms);
            }
        }

        for event in self.socket.poll_events() {
            self.handle_socket_event(event, now_ms);
        }

        if let Some(deadline) = self.handshake_deadline_ms {
            if now_ms >= deadline && self.state == ConnectionState::Connecting {
                tracing::warn!("handshake timed out");
                self.handshake_deadline_ms = None;
                self.socket.close();
                self.schedule_reconnect(now_ms);
            }
        }

        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| now_ms >= p.deadline_ms)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            if let Some(p) = self.pending.remove(&id) {
                tracing::warn!(invocation_id = id, "invocation timed out");
                (p.on_complete)(Err(TransportError::InvocationTimeout(id)));
            }
        }
    }

    fn begin_connect(&mut self, now_ms: f64) {
        self.handshake_acked = false;
        self.handshake_deadline_ms = Some(now_ms + self.options.handshake_timeout_ms);
        self.socket.connect(&self.options.url);
        self.transition(ConnectionState::Connecting);
    }

    fn schedule_reconnect(&mut self, now_ms: f64) {
        self.handshake_deadline_ms = None;
        let delay = backoff_delay(self.reconnect_attempt);
        self.reconnect_attempt += 1;
        self.reconnect_deadline_ms = Some(now_ms + delay);
        self.transition(ConnectionState::Reconnecting);
    }

    fn handle_socket_event(&mut self, event: SocketEvent, now_ms: f64) {
        match event {
            SocketEvent::Open => {
                let handshake = HandshakeRequest::default();
                let mut frame = serde_json::to_string(&handshake).expect("HandshakeRequest is infallible to serialize");
                frame.push(minimact_protocol::RECORD_SEPARATOR as char);
                if let Err(err) = self.socket.send(&frame) {
                    tracing::warn!(?err, "failed to send handshake request");
                }
            }
            SocketEvent::Message(raw) => self.handle_frame(&raw, now_ms),
            SocketEvent::Closed { allow_reconnect } => {
                tracing::info!(allow_reconnect, "socket closed");
                self.fail_all_pending();
                if allow_reconnect {
                    self.schedule_reconnect(now_ms);
                } else {
                    self.handshake_deadline_ms = None;
                    self.transition(ConnectionState::Disconnected);
                }
            }
            SocketEvent::Error(message) => tracing::warn!(message, "socket error"),
        }
    }

    fn handle_frame(&mut self, raw_frame: &str, now_ms: f64) {
        let mut segments = split_frame(raw_frame).peekable();

        if !self.handshake_acked {
            let Some(first) = segments.next() else { return };
            match serde_json::from_str::<HandshakeResponse>(first) {
                Ok(response) if response.error.is_none() => {
                    self.handshake_acked = true;
                    self.handshake_deadline_ms = None;
                    self.reconnect_attempt = 0;
                    self.transition(ConnectionState::Connected);
                }
                Ok(response) => {
                    let error = response.error.unwrap_or_default();
                    tracing::warn!(error, "handshake rejected");
                    self.handshake_deadline_ms = None;
                    self.schedule_reconnect(now_ms);
                    return;
                }
                Err(err) => {
                    tracing::warn!(?err, "malformed handshake response");
                    self.handshake_deadline_ms = None;
                    self.schedule_reconnect(now_ms);
                    return;
                }
            }
        }

        let remainder: String = segments.collect::<Vec<_>>().join("\u{1E}");
        if remainder.is_empty() {
            return;
        }
        for parsed in parse_frame(&remainder) {
            match parsed {
                Ok(message) => self.handle_message(message),
                Err(err) => tracing::warn!(?err, "dropping unparseable message"),
            }
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Invocation { target, arguments, .. } => {
                if let Some(handlers) = self.handlers.get_mut(&target) {
                    for handler in handlers.iter_mut() {
                        handler(&arguments);
                    }
                } else {
                    tracing::debug!(target, "no handler registered for invocation target");
                }
            }
            Message::Completion { invocation_id, result, error } => {
                match self.pending.remove(&invocation_id) {
                    Some(p) => {
                        let outcome = match error {
                            Some(message) => Err(TransportError::Socket(message)),
                            None => Ok(result),
                        };
                        (p.on_complete)(outcome);
                    }
                    None => tracing::warn!(invocation_id, "completion for unknown or already-resolved invocation"),
                }
            }
            Message::Ping => {
                tracing::trace!("ping");
                if self.state == ConnectionState::Connected {
                    if let Err(err) = self.socket.send(&Message::Ping.encode()) {
                        tracing::warn!(?err, "failed to send pong");
                    }
                }
            }
            Message::Close { error, allow_reconnect } => {
                tracing::info!(?error, allow_reconnect, "server requested close");
            }
        }
    }

    fn fail_all_pending(&mut self) {
        for (id, p) in self.pending.drain() {
            tracing::debug!(invocation_id = id, "rejecting pending invocation");
            (p.on_complete)(Err(TransportError::Closed));
        }
    }

    fn transition(&mut self, new_state: ConnectionState) {
        if new_state == self.state {
            return;
        }
        let old = self.state;
        self.state = new_state;
        for handler in self.state_handlers.iter_mut() {
            handler(old, new_state);
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<S: Socket> Connection<S> {
    /// Inspect the underlying socket, e.g. to assert on what a
    /// [`crate::socket::mock::MockSocket`] has buffered as sent.
    pub fn socket(&self) -> &S {
        &self.socket
    }
}

#[cfg(any(test, feature = "testing"))]
impl Connection<crate::socket::mock::MockSocket> {
    /// Feed an event directly to the mock socket, standing in for what the
    /// browser would otherwise deliver asynchronously.
    pub fn test_push_event(&mut self, event: SocketEvent) {
        self.socket.push_event(event);
    }
}
