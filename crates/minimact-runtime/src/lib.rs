//! Ties the other five crates together into the thing that actually runs in
//! a page: component context and the setter pipeline (§4.7), hydration and
//! event delegation (§4.8), and the runtime facade that wires transport,
//! hints, and the DOM driver into one dispatch table (§4.9).
//!
//! The non-wasm build of this crate (used by its own test suite and by
//! `minimact-transport`'s `testing` feature) compiles everything except
//! [`mount`], which needs a real `window`/`document` and is gated to
//! `wasm32` accordingly.

mod context;
mod delegate;
mod hydrate;
mod pipeline;
mod runtime;

pub use context::{BoundTemplate, BoundTemplateKind, ComponentContext, StateSlot};
pub use delegate::{find_component_id, find_handler, parse_handler_attribute, HandlerAttribute, DELEGATED_EVENT_TYPES};
pub use hydrate::{hydrate_all, hydrate_component};
pub use pipeline::{apply_array_operation, apply_state_change};
pub use runtime::Runtime;

/// Boots the runtime against the real page: installs a `tracing` subscriber
/// that forwards to the console, a panic hook that does the same for Rust
/// panics, then hydrates every component already in the document and opens
/// the connection.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn mount(url: String) -> Result<(), wasm_bindgen::JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    let driver = minimact_dom::BrowserDriver::new()?;
    let document_root: web_sys::Node = driver.document().clone().into();
    let socket = minimact_transport::BrowserSocket::new();
    let options = minimact_transport::ConnectionOptions {
        url,
        ..Default::default()
    };
    let runtime = Runtime::new(options, socket, driver, minimact_hints::HintQueueOptions::default());

    runtime.start(document_root, now_ms());
    install_poll_loop(runtime);
    Ok(())
}

/// Drives [`Runtime::poll`] off `requestAnimationFrame`, so reconnect
/// backoff and invocation timeouts make progress without any `setInterval`
/// plumbing of their own.
#[cfg(target_arch = "wasm32")]
fn install_poll_loop(runtime: Runtime<minimact_transport::BrowserSocket, minimact_dom::BrowserDriver>) {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    let f = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        runtime.poll(now_ms());
        request_animation_frame(f.borrow().as_ref().unwrap());
    }) as Box<dyn FnMut()>));

    request_animation_frame(g.borrow().as_ref().unwrap());
}

#[cfg(target_arch = "wasm32")]
fn request_animation_frame(f: &wasm_bindgen::closure::Closure<dyn FnMut()>) {
    use wasm_bindgen::JsCast;
    web_sys::window()
        .expect("no window")
        .request_animation_frame(f.as_ref().unchecked_ref())
        .expect("requestAnimationFrame failed");
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
