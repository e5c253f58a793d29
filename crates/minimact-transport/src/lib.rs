//! The SignalR-JSON-compatible wire connection (§4.1): handshake, frame
//! parsing/dispatch, invocation correlation, and reconnect backoff, all
//! abstracted over [`Socket`] so the state machine never touches a real
//! `web_sys::WebSocket` directly.

mod connection;
mod error;
mod socket;
mod state;

pub use connection::{Connection, ConnectionOptions};
pub use error::TransportError;
#[cfg(target_arch = "wasm32")]
pub use socket::browser::BrowserSocket;
pub use socket::mock;
pub use socket::{Socket, SocketEvent};
pub use state::ConnectionState;
