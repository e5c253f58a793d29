//! The raw byte/text transport underneath a [`crate::Connection`].
//!
//! `Connection` never touches `web_sys::WebSocket` directly; it only knows
//! about [`Socket`]. Events are drained through [`Socket::poll_events`]
//! rather than delivered via callback, so [`crate::Connection::poll`] can
//! stay a plain synchronous function the runtime drives from a
//! `requestAnimationFrame` loop, and tests can drive it without a browser.

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Open,
    Message(String),
    Closed { allow_reconnect: bool },
    Error(String),
}

pub trait Socket {
    fn connect(&mut self, url: &str);
    fn send(&mut self, frame: &str) -> Result<(), TransportError>;
    fn close(&mut self);
    fn poll_events(&mut self) -> Vec<SocketEvent>;
}

/// `web_sys::WebSocket`-backed implementation. Event closures push into a
/// shared queue rather than calling back into `Connection` directly, per
/// the devtools websocket's `Closure::wrap` + `.forget()` pattern.
#[cfg(target_arch = "wasm32")]
pub mod browser {
    use super::{Socket, SocketEvent};
    use crate::error::TransportError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

    pub struct BrowserSocket {
        ws: Option<WebSocket>,
        events: Rc<RefCell<VecDeque<SocketEvent>>>,
        // Closures must outlive the socket; `Closure::forget` leaks them for
        // the life of the page.
    }

    impl BrowserSocket {
        pub fn new() -> Self {
            BrowserSocket {
                ws: None,
                events: Rc::new(RefCell::new(VecDeque::new())),
            }
        }
    }

    impl Default for BrowserSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Socket for BrowserSocket {
        fn connect(&mut self, url: &str) {
            let ws = match WebSocket::new(url) {
                Ok(ws) => ws,
                Err(err) => {
                    self.events.borrow_mut().push_back(SocketEvent::Error(format!("{err:?}")));
                    return;
                }
            };
            ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

            let events = self.events.clone();
            let onopen = Closure::wrap(Box::new(move |_: JsValue| {
                events.borrow_mut().push_back(SocketEvent::Open);
            }) as Box<dyn FnMut(JsValue)>);
            ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
            onopen.forget();

            let events = self.events.clone();
            let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
                if let Some(text) = event.data().as_string() {
                    events.borrow_mut().push_back(SocketEvent::Message(text));
                }
            }) as Box<dyn FnMut(MessageEvent)>);
            ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
            onmessage.forget();

            let events = self.events.clone();
            let onclose = Closure::wrap(Box::new(move |event: CloseEvent| {
                events.borrow_mut().push_back(SocketEvent::Closed {
                    allow_reconnect: !matches!(event.code(), 1000 | 1001),
                });
            }) as Box<dyn FnMut(CloseEvent)>);
            ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
            onclose.forget();

            let events = self.events.clone();
            let onerror = Closure::wrap(Box::new(move |event: ErrorEvent| {
                events.borrow_mut().push_back(SocketEvent::Error(event.message()));
            }) as Box<dyn FnMut(ErrorEvent)>);
            ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();

            self.ws = Some(ws);
        }

        fn send(&mut self, frame: &str) -> Result<(), TransportError> {
            match &self.ws {
                Some(ws) => ws.send_with_str(frame).map_err(|e| TransportError::Socket(format!("{e:?}"))),
                None => Err(TransportError::Closed),
            }
        }

        fn close(&mut self) {
            if let Some(ws) = self.ws.take() {
                let _ = ws.close();
            }
        }

        fn poll_events(&mut self) -> Vec<SocketEvent> {
            self.events.borrow_mut().drain(..).collect()
        }
    }
}

/// In-memory double for tests: `push_event` simulates what the browser
/// would otherwise deliver asynchronously.
pub mod mock {
    use super::{Socket, SocketEvent};
    use crate::error::TransportError;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    pub struct MockSocket {
        pub connected_url: Option<String>,
        pub sent: Vec<String>,
        pub closed: bool,
        events: VecDeque<SocketEvent>,
    }

    impl MockSocket {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_event(&mut self, event: SocketEvent) {
            self.events.push_back(event);
        }
    }

    impl Socket for MockSocket {
        fn connect(&mut self, url: &str) {
            self.connected_url = Some(url.to_string());
            self.closed = false;
        }

        fn send(&mut self, frame: &str) -> Result<(), TransportError> {
            if self.closed || self.connected_url.is_none() {
                return Err(TransportError::Closed);
            }
            self.sent.push(frame.to_string());
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn poll_events(&mut self) -> Vec<SocketEvent> {
            self.events.drain(..).collect()
        }
    }
}
