//! The state-change pipeline (§4.7): the ordered steps a `useState`-shaped
//! setter runs on every call. Free functions over explicit pieces
//! (connection, driver, hint queue, component context) rather than methods
//! on a combined struct, so they're callable under a plain `#[cfg(test)]`
//! without needing `Runtime`'s `Rc<RefCell<..>>` wiring.

use crate::context::{BoundTemplateKind, ComponentContext};
use minimact_dom::DomDriver;
use minimact_hints::HintQueue;
use minimact_protocol::{ArrayOperation, StateMap};
use minimact_transport::{Connection, Socket};
use serde_json::Value;

/// Steps 1-6 for a plain `set(value)` call: hint probe, local state update,
/// local template fast path, then fire-and-forget server sync.
pub fn apply_state_change<S: Socket, D: DomDriver>(
    connection: &mut Connection<S>,
    driver: &mut D,
    hints: &mut HintQueue,
    ctx: &mut ComponentContext<D::Node>,
    state_key: &str,
    new_value: Value,
    now_ms: f64,
) {
    let mut state_changes = StateMap::new();
    state_changes.insert(state_key.to_string(), new_value.clone());

    probe_hint_and_apply(driver, hints, ctx, &state_changes, now_ms);

    ctx.set_raw(state_key, new_value.clone());
    rerender_bound_templates(driver, ctx, state_key);

    if let Err(err) = connection.send(
        "UpdateComponentState",
        vec![
            Value::String(ctx.component_id.clone()),
            Value::String(state_key.to_string()),
            new_value,
        ],
    ) {
        tracing::warn!(component_id = %ctx.component_id, state_key, ?err, "UpdateComponentState send failed");
    }
}

/// The array-operation variant of the pipeline (§4.7 "If the current value
/// is an array…"). `new_items` is the already-computed new array; `operation`
/// is the semantic descriptor sent alongside it so the server can index
/// precisely into loop templates instead of re-deriving intent from a diff.
pub fn apply_array_operation<S: Socket, D: DomDriver>(
    connection: &mut Connection<S>,
    driver: &mut D,
    hints: &mut HintQueue,
    ctx: &mut ComponentContext<D::Node>,
    state_key: &str,
    new_items: Vec<Value>,
    operation: ArrayOperation,
    now_ms: f64,
) {
    let new_value = Value::Array(new_items);
    let mut state_changes = StateMap::new();
    state_changes.insert(state_key.to_string(), new_value.clone());

    probe_hint_and_apply(driver, hints, ctx, &state_changes, now_ms);

    ctx.set_raw(state_key, new_value.clone());
    rerender_bound_templates(driver, ctx, state_key);

    let operation_json = serde_json::to_value(&operation).unwrap_or(Value::Null);
    if let Err(err) = connection.send(
        "UpdateComponentStateWithOperation",
        vec![
            Value::String(ctx.component_id.clone()),
            Value::String(state_key.to_string()),
            new_value,
            operation_json,
        ],
    ) {
        tracing::warn!(component_id = %ctx.component_id, state_key, ?err, "UpdateComponentStateWithOperation send failed");
    }
}

fn probe_hint_and_apply<D: DomDriver>(
    driver: &mut D,
    hints: &mut HintQueue,
    ctx: &ComponentContext<D::Node>,
    state_changes: &StateMap,
    now_ms: f64,
) {
    if let Some(matched) = hints.match_hint(&ctx.component_id, state_changes, now_ms) {
        minimact_dom::apply_patches(driver, &ctx.root, &matched.patches);
        tracing::debug!(component_id = %ctx.component_id, hint_id = %matched.hint_id, "hint cache hit");
    }
}

/// §4.7 step 5: re-render every template bound to `state_key` and write the
/// result directly at its path, independent of the hint queue.
fn rerender_bound_templates<D: DomDriver>(driver: &mut D, ctx: &ComponentContext<D::Node>, state_key: &str) {
    let state = ctx.state().clone();
    for bound in ctx.templates_depending_on(state_key) {
        let Some(node) = minimact_dom::resolve_path(driver, &ctx.root, &bound.path) else {
            tracing::warn!(path = ?bound.path, "bound template path no longer resolves, skipping");
            continue;
        };
        match &bound.kind {
            BoundTemplateKind::Text(tp) => {
                let rendered = minimact_template::render_template_patch(tp, &state);
                driver.set_text_content(&node, &rendered);
            }
            BoundTemplateKind::Prop { name, template } => {
                let rendered = minimact_template::render_template_patch(template, &state);
                minimact_dom::set_materialized_prop(driver, &node, name, &rendered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BoundTemplate;
    use minimact_hints::HintQueueOptions;
    use minimact_protocol::{Binding, Patch, Path, TemplatePatch, VNode};
    use minimact_transport::{mock::MockSocket, ConnectionOptions};

    fn connected_connection() -> Connection<MockSocket> {
        #[allow(deprecated)]
        let options = ConnectionOptions {
            url: "wss://example.test".into(),
            handshake_timeout_ms: 1_000.0,
            invocation_timeout_ms: 1_000.0,
            reconnect_interval_ms: None,
        };
        let mut conn = Connection::new(options, MockSocket::new());
        conn.start(0.0);
        conn.test_push_event(minimact_transport::SocketEvent::Open);
        conn.poll(0.0);
        conn.test_push_event(minimact_transport::SocketEvent::Message("{}\u{1E}".into()));
        conn.poll(0.0);
        assert_eq!(conn.state(), minimact_transport::ConnectionState::Connected);
        conn
    }

    #[test]
    fn plain_set_updates_state_and_sends_sync_message() {
        let mut conn = connected_connection();
        let mut driver = minimact_dom::MockDriver::new();
        let mut hints = HintQueue::new(HintQueueOptions::default());
        let root = driver.create_element("div");
        let mut ctx = ComponentContext::new("c1", root);
        ctx.use_state(Value::from(0));

        apply_state_change(&mut conn, &mut driver, &mut hints, &mut ctx, "state_0", Value::from(1), 0.0);

        assert_eq!(ctx.get("state_0"), Some(&Value::from(1)));
    }

    #[test]
    fn matched_hint_applies_patches_before_local_state_commits() {
        let mut conn = connected_connection();
        let mut driver = minimact_dom::MockDriver::new();
        let root = driver.create_element("div");
        let mut ctx = ComponentContext::new("c1", root);
        ctx.use_state(Value::from(0));

        let mut predicted_state = StateMap::new();
        predicted_state.insert("state_0".to_string(), Value::from(1));
        let mut hints = HintQueue::new(HintQueueOptions::default());
        hints.queue_hint(
            minimact_protocol::Hint {
                component_id: "c1".into(),
                hint_id: "h1".into(),
                patches: vec![Patch::Create { path: Path(vec![0]), node: VNode::text("hinted") }],
                confidence: 0.9,
                predicted_state,
                queued_at: 0.0,
                is_template: false,
            },
            0.0,
        );

        apply_state_change(&mut conn, &mut driver, &mut hints, &mut ctx, "state_0", Value::from(1), 0.0);

        let child = driver.child_at(&root, 0).unwrap();
        assert_eq!(driver.text_of(child), "hinted");
        assert!(hints.is_empty());
    }

    #[test]
    fn bound_text_template_rerenders_in_place_on_matching_state_change() {
        let mut conn = connected_connection();
        let mut driver = minimact_dom::MockDriver::new();
        let mut hints = HintQueue::new(HintQueueOptions::default());
        let root = driver.create_element("div");
        let child = driver.create_text("0");
        driver.append_child(&root, child);

        let mut ctx = ComponentContext::new("c1", root);
        ctx.use_state(Value::from(0));
        ctx.bind_template(BoundTemplate {
            path: Path(vec![0]),
            kind: BoundTemplateKind::Text(TemplatePatch {
                template: "{0}".into(),
                bindings: vec![Binding::Key("state_0".into())],
                slots: vec![],
                conditional_templates: None,
                conditional_binding_index: None,
            }),
        });

        apply_state_change(&mut conn, &mut driver, &mut hints, &mut ctx, "state_0", Value::from(42), 0.0);

        assert_eq!(driver.text_of(child), "42");
    }

    #[test]
    fn array_operation_updates_state_with_the_computed_array() {
        let mut conn = connected_connection();
        let mut driver = minimact_dom::MockDriver::new();
        let mut hints = HintQueue::new(HintQueueOptions::default());
        let root = driver.create_element("div");
        let mut ctx = ComponentContext::new("c1", root);
        ctx.use_state(Value::Array(vec![Value::from("a")]));

        apply_array_operation(
            &mut conn,
            &mut driver,
            &mut hints,
            &mut ctx,
            "state_0",
            vec![Value::from("a"), Value::from("b")],
            ArrayOperation::Append { item: Value::from("b") },
            0.0,
        );

        assert_eq!(ctx.get("state_0"), Some(&Value::Array(vec![Value::from("a"), Value::from("b")])));
    }
}
