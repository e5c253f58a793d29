//! The runtime facade (§4.9): wires transport, hint queue, and DOM driver
//! together, installs the server→client dispatch table, hydrates every
//! component already in the document, and re-registers them on reconnect.
//!
//! WASM is single-threaded, so shared mutable state is `Rc<RefCell<..>>`
//! rather than `Arc<Mutex<..>>`. `Connection<S>` and the rest of the
//! runtime's state live in *separate* `RefCell`s on purpose: message
//! dispatch runs from inside `Connection::poll`, so a handler that needs to
//! touch the DOM/hint queue/components must not also need to re-borrow the
//! `Connection` it's currently being called from — that would panic. Any
//! handler that needs to talk back to the connection (re-registering
//! components after a reconnect) instead sets a flag on the state side and
//! `Runtime::poll` acts on it once `Connection::poll` has returned and its
//! `RefCell` is free again.

use crate::context::{BoundTemplate, BoundTemplateKind, ComponentContext, StateSlot};
use crate::delegate;
use minimact_dom::DomDriver;
use minimact_hints::{HintQueue, HintQueueOptions};
use minimact_protocol::{ArrayOperation, Hint, Patch};
use minimact_transport::{Connection, ConnectionOptions, ConnectionState, Socket};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct RuntimeState<D: DomDriver> {
    driver: D,
    hints: HintQueue,
    components: HashMap<String, ComponentContext<D::Node>>,
    needs_register_all: bool,
    /// The `now_ms` of the most recent [`Runtime::poll`] call, so a
    /// dispatch handler firing synchronously from inside `Connection::poll`
    /// (which only passes it `&[Value]`) can still stamp a freshly arrived
    /// hint with an accurate queue time.
    last_poll_now_ms: f64,
}

/// A cheap-to-clone handle to the runtime. Cloning shares the same
/// underlying state; every clone observes the same components and
/// connection.
pub struct Runtime<S: Socket, D: DomDriver> {
    connection: Rc<RefCell<Connection<S>>>,
    state: Rc<RefCell<RuntimeState<D>>>,
}

impl<S: Socket, D: DomDriver> Clone for Runtime<S, D> {
    fn clone(&self) -> Self {
        Runtime {
            connection: Rc::clone(&self.connection),
            state: Rc::clone(&self.state),
        }
    }
}

impl<S: Socket + 'static, D: DomDriver + 'static> Runtime<S, D> {
    pub fn new(options: ConnectionOptions, socket: S, driver: D, hint_options: HintQueueOptions) -> Self {
        let runtime = Runtime {
            connection: Rc::new(RefCell::new(Connection::new(options, socket))),
            state: Rc::new(RefCell::new(RuntimeState {
                driver,
                hints: HintQueue::new(hint_options),
                components: HashMap::new(),
                needs_register_all: false,
                last_poll_now_ms: 0.0,
            })),
        };
        runtime.install_dispatch();
        runtime
    }

    /// Hydrate every component under `document_root`, install the lifecycle
    /// hook that re-registers components on (re)connect, and open the
    /// connection (§4.9).
    pub fn start(&self, document_root: D::Node, now_ms: f64) {
        {
            let mut state = self.state.borrow_mut();
            let contexts = crate::hydrate::hydrate_all(&state.driver, &document_root);
            for ctx in contexts {
                state.components.insert(ctx.component_id.clone(), ctx);
            }
        }

        let lifecycle_state = Rc::clone(&self.state);
        self.connection.borrow_mut().on_state_change(move |_old, new| {
            if new == ConnectionState::Connected {
                lifecycle_state.borrow_mut().needs_register_all = true;
            }
        });

        self.connection.borrow_mut().start(now_ms);
    }

    pub fn stop(&self) {
        self.connection.borrow_mut().stop();
    }

    /// Drive the connection's timers and socket events, then act on
    /// whatever the dispatch handlers deferred (currently just
    /// re-registering components after a reconnect).
    pub fn poll(&self, now_ms: f64) {
        self.state.borrow_mut().last_poll_now_ms = now_ms;
        self.connection.borrow_mut().poll(now_ms);
        self.drain_deferred_actions();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.borrow().state()
    }

    fn drain_deferred_actions(&self) {
        let component_ids: Vec<String> = {
            let mut state = self.state.borrow_mut();
            if !std::mem::take(&mut state.needs_register_all) {
                return;
            }
            state.components.keys().cloned().collect()
        };
        let mut connection = self.connection.borrow_mut();
        for component_id in component_ids {
            register_component(&mut connection, &component_id);
        }
    }

    /// §4.8 hydration: bind one container to a new [`ComponentContext`] and
    /// register it with the server if already connected.
    pub fn hydrate(&self, container: &D::Node) {
        let Some(ctx) = crate::hydrate::hydrate_component(&self.state.borrow().driver, container) else {
            return;
        };
        let component_id = ctx.component_id.clone();
        self.state.borrow_mut().components.insert(component_id.clone(), ctx);
        if self.connection_state() == ConnectionState::Connected {
            register_component(&mut self.connection.borrow_mut(), &component_id);
        }
    }

    /// Declare a new state slot on an already-hydrated component (§4.7).
    pub fn use_state(&self, component_id: &str, initial: Value) -> Option<StateSlot> {
        let mut state = self.state.borrow_mut();
        let ctx = state.components.get_mut(component_id)?;
        Some(ctx.use_state(initial))
    }

    pub fn set_state(&self, slot: &StateSlot, new_value: Value, now_ms: f64) {
        let mut connection = self.connection.borrow_mut();
        let mut state = self.state.borrow_mut();
        let RuntimeState { driver, hints, components, .. } = &mut *state;
        let Some(ctx) = components.get_mut(&slot.component_id) else {
            tracing::warn!(component_id = slot.component_id, "set_state: unknown component");
            return;
        };
        crate::pipeline::apply_state_change(&mut connection, driver, hints, ctx, &slot.state_key, new_value, now_ms);
    }

    pub fn apply_array_operation(
        &self,
        slot: &StateSlot,
        new_items: Vec<Value>,
        operation: ArrayOperation,
        now_ms: f64,
    ) {
        let mut connection = self.connection.borrow_mut();
        let mut state = self.state.borrow_mut();
        let RuntimeState { driver, hints, components, .. } = &mut *state;
        let Some(ctx) = components.get_mut(&slot.component_id) else {
            tracing::warn!(component_id = slot.component_id, "apply_array_operation: unknown component");
            return;
        };
        crate::pipeline::apply_array_operation(
            &mut connection,
            driver,
            hints,
            ctx,
            &slot.state_key,
            new_items,
            operation,
            now_ms,
        );
    }

    /// §4.8: dispatch a delegated DOM event. `event_name` is one of
    /// [`delegate::DELEGATED_EVENT_TYPES`]; `input_value` is the target
    /// element's `value`, prepended to the argument list for input/change
    /// events (§4.8).
    pub fn dispatch_event(&self, target: &D::Node, event_name: &str, input_value: Option<String>, now_ms: f64) {
        let (attribute, component_id) = {
            let state = self.state.borrow();
            let Some((handler_node, attribute)) = delegate::find_handler(&state.driver, target, event_name) else {
                return;
            };
            let Some(component_id) = delegate::find_component_id(&state.driver, &handler_node) else {
                tracing::warn!(method = attribute.method, "delegated event has no enclosing component id");
                return;
            };
            (attribute, component_id)
        };

        let mut args: Vec<Value> = Vec::new();
        if matches!(event_name, "input" | "change") {
            if let Some(value) = input_value {
                args.push(Value::String(value));
            }
        }
        args.extend(attribute.args.into_iter().map(Value::String));

        let mut connection = self.connection.borrow_mut();
        let result = connection.invoke(
            "InvokeComponentMethod",
            vec![Value::String(component_id), Value::String(attribute.method), Value::Array(args)],
            now_ms,
            |result| {
                if let Err(err) = result {
                    tracing::warn!(?err, "InvokeComponentMethod failed");
                }
            },
        );
        if let Err(err) = result {
            tracing::warn!(?err, "could not dispatch delegated event");
        }
    }

    fn install_dispatch(&self) {
        let mut connection = self.connection.borrow_mut();

        let state = Rc::clone(&self.state);
        connection.on("UpdateComponent", move |args| handle_update_component(&state, args));

        let state = Rc::clone(&self.state);
        connection.on("ApplyPatches", move |args| handle_apply_patches(&state, args));

        let state = Rc::clone(&self.state);
        connection.on("ApplyPrediction", move |args| handle_apply_prediction(&state, args));

        let state = Rc::clone(&self.state);
        connection.on("ApplyCorrection", move |args| handle_apply_correction(&state, args));

        let state = Rc::clone(&self.state);
        connection.on("QueueHint", move |args| handle_queue_hint(&state, args));

        connection.on("Error", |args| {
            let message = args.first().and_then(Value::as_str).unwrap_or("<no message>");
            tracing::error!(message, "server reported an error");
        });
    }
}

fn register_component<S: Socket>(connection: &mut Connection<S>, component_id: &str) {
    if let Err(err) = connection.send("RegisterComponent", vec![Value::String(component_id.to_string())]) {
        tracing::warn!(component_id, ?err, "RegisterComponent send failed");
    }
}

fn handle_update_component<D: DomDriver>(state: &Rc<RefCell<RuntimeState<D>>>, args: &[Value]) {
    let mut state = state.borrow_mut();
    let (Some(component_id), Some(html)) = (arg_str(args, 0), arg_str(args, 1)) else {
        tracing::warn!("UpdateComponent: malformed arguments");
        return;
    };
    let Some(ctx) = state.components.get(component_id) else {
        tracing::warn!(component_id, "UpdateComponent: unknown component");
        return;
    };
    let root = ctx.root.clone();
    minimact_dom::replace_html(&mut state.driver, &root, html);
}

fn handle_apply_patches<D: DomDriver>(state: &Rc<RefCell<RuntimeState<D>>>, args: &[Value]) {
    let mut state = state.borrow_mut();
    let Some(component_id) = arg_str(args, 0).map(str::to_string) else {
        tracing::warn!("ApplyPatches: missing componentId");
        return;
    };
    let Some(patches) = args.get(1).and_then(|v| serde_json::from_value::<Vec<Patch>>(v.clone()).ok()) else {
        tracing::warn!(component_id, "ApplyPatches: malformed patches");
        return;
    };
    apply_patches_to_component(&mut state, &component_id, &patches);
}

#[derive(serde::Deserialize)]
struct PredictionArgs {
    #[serde(rename = "componentId")]
    component_id: String,
    patches: Vec<Patch>,
}

fn handle_apply_prediction<D: DomDriver>(state: &Rc<RefCell<RuntimeState<D>>>, args: &[Value]) {
    let mut state = state.borrow_mut();
    let Some(parsed) = args.first().and_then(|v| serde_json::from_value::<PredictionArgs>(v.clone()).ok()) else {
        tracing::warn!("ApplyPrediction: malformed argument");
        return;
    };
    apply_patches_to_component(&mut state, &parsed.component_id, &parsed.patches);
}

fn handle_apply_correction<D: DomDriver>(state: &Rc<RefCell<RuntimeState<D>>>, args: &[Value]) {
    // Same wire shape as a prediction: a fresh authoritative batch correcting
    // whatever the earlier speculative patches got wrong.
    handle_apply_prediction(state, args);
}

fn handle_queue_hint<D: DomDriver>(state: &Rc<RefCell<RuntimeState<D>>>, args: &[Value]) {
    let mut state = state.borrow_mut();
    let Some(hint) = args.first().and_then(|v| serde_json::from_value::<Hint>(v.clone()).ok()) else {
        tracing::warn!("QueueHint: malformed argument");
        return;
    };
    let component_id = hint.component_id.clone();
    if !state.components.contains_key(&component_id) {
        tracing::warn!(component_id, "QueueHint: unknown component, queuing anyway");
    }
    let now_ms = state.last_poll_now_ms;
    state.hints.queue_hint(hint, now_ms);
}

fn apply_patches_to_component<D: DomDriver>(state: &mut RuntimeState<D>, component_id: &str, patches: &[Patch]) {
    let Some(ctx) = state.components.get_mut(component_id) else {
        tracing::warn!(component_id, "patch batch for unknown component");
        return;
    };
    for patch in patches {
        match patch {
            Patch::UpdateTextTemplate { path, template_patch } => {
                ctx.bind_template(BoundTemplate {
                    path: path.clone(),
                    kind: BoundTemplateKind::Text(template_patch.clone()),
                });
            }
            Patch::UpdatePropsTemplate { path, prop_name, template_patch } => {
                ctx.bind_template(BoundTemplate {
                    path: path.clone(),
                    kind: BoundTemplateKind::Prop {
                        name: prop_name.clone(),
                        template: template_patch.clone(),
                    },
                });
            }
            _ => {}
        }
    }
    let materialized = minimact_template::materialize_patches(patches, ctx.state());
    minimact_dom::apply_patches(&mut state.driver, &ctx.root, &materialized);
}

fn arg_str(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_dom::MockDriver;
    use minimact_protocol::{Path, VNode};
    use minimact_transport::mock::MockSocket;

    fn runtime() -> Runtime<MockSocket, MockDriver> {
        #[allow(deprecated)]
        let options = ConnectionOptions {
            url: "wss://example.test".into(),
            handshake_timeout_ms: 1_000.0,
            invocation_timeout_ms: 1_000.0,
            reconnect_interval_ms: None,
        };
        Runtime::new(options, MockSocket::new(), MockDriver::new(), HintQueueOptions::default())
    }

    fn connect(runtime: &Runtime<MockSocket, MockDriver>) {
        runtime.start(new_document(runtime), 0.0);
        push_and_poll(runtime, minimact_transport::SocketEvent::Open, 0.0);
        push_and_poll(runtime, minimact_transport::SocketEvent::Message("{}\u{1E}".into()), 0.0);
        assert_eq!(runtime.connection_state(), ConnectionState::Connected);
    }

    fn new_document(runtime: &Runtime<MockSocket, MockDriver>) -> <MockDriver as DomDriver>::Node {
        runtime.state.borrow_mut().driver.new_root()
    }

    fn push_and_poll(runtime: &Runtime<MockSocket, MockDriver>, event: minimact_transport::SocketEvent, now_ms: f64) {
        runtime.connection.borrow_mut().test_push_event(event);
        runtime.poll(now_ms);
    }

    #[test]
    fn start_hydrates_existing_components_and_connects() {
        let runtime = runtime();
        let doc = new_document(&runtime);
        {
            let mut state = runtime.state.borrow_mut();
            let container = state.driver.create_element("div");
            state.driver.set_attribute(&container, "data-minimact-component", "c1");
            let root = state.driver.create_element("div");
            state.driver.append_child(&container, root);
            state.driver.append_child(&doc, container);
        }

        runtime.start(doc, 0.0);
        assert!(runtime.state.borrow().components.contains_key("c1"));

        push_and_poll(&runtime, minimact_transport::SocketEvent::Open, 0.0);
        push_and_poll(&runtime, minimact_transport::SocketEvent::Message("{}\u{1E}".into()), 0.0);
        assert_eq!(runtime.connection_state(), ConnectionState::Connected);

        let sent = &runtime.connection.borrow().socket().sent;
        assert!(sent.iter().any(|frame| frame.contains("RegisterComponent") && frame.contains("c1")));
    }

    #[test]
    fn apply_patches_dispatch_materializes_and_applies_to_the_component_root() {
        let runtime = runtime();
        connect(&runtime);

        let root = {
            let mut state = runtime.state.borrow_mut();
            let root = state.driver.create_element("div");
            state.components.insert("c1".into(), ComponentContext::new("c1", root));
            root
        };

        let patches_json = serde_json::to_value(vec![Patch::Create { path: Path(vec![0]), node: VNode::text("hi") }]).unwrap();
        runtime
            .connection
            .borrow_mut()
            .test_push_event(minimact_transport::SocketEvent::Message(format!(
                "{{\"type\":1,\"target\":\"ApplyPatches\",\"arguments\":[\"c1\",{patches_json}]}}\u{{1E}}"
            )));
        runtime.poll(0.0);

        let state = runtime.state.borrow();
        let child = state.driver.child_at(&root, 0).unwrap();
        assert_eq!(state.driver.text_of(child), "hi");
    }

    #[test]
    fn reconnect_causes_every_hydrated_component_to_re_register() {
        let runtime = runtime();
        connect(&runtime);
        let root = runtime.state.borrow_mut().driver.create_element("div");
        runtime.state.borrow_mut().components.insert("c1".into(), ComponentContext::new("c1", root));
        runtime.connection.borrow_mut().test_push_event(minimact_transport::SocketEvent::Closed { allow_reconnect: true });
        runtime.poll(0.0);
        runtime.poll(2_000.0);
        push_and_poll(&runtime, minimact_transport::SocketEvent::Open, 2_000.0);
        push_and_poll(&runtime, minimact_transport::SocketEvent::Message("{}\u{1E}".into()), 2_000.0);

        assert_eq!(runtime.connection_state(), ConnectionState::Connected);
        let sent = &runtime.connection.borrow().socket().sent;
        assert!(sent.iter().filter(|frame| frame.contains("RegisterComponent")).count() >= 2);
    }
}
