//! Loop expansion for `LoopTemplate` (§4.4 "Loop expansion").

use crate::render::render_template_patch;
use minimact_protocol::{ItemTemplate, LoopTemplate, StateMap, VNode};
use serde_json::Value;

/// Build the per-iteration scope: the outer state plus `item`, `index`, an
/// optional `index_var` alias, and a flattened `item.<k>` keyspace for each
/// own string key of `item` (when `item` is an object).
fn build_scope(state: &StateMap, item: &Value, index: usize, index_var: Option<&str>) -> StateMap {
    let mut scope = state.clone();
    scope.insert("item".to_string(), item.clone());
    scope.insert("index".to_string(), Value::from(index));
    if let Some(var) = index_var {
        scope.insert(var.to_string(), Value::from(index));
    }
    if let Value::Object(fields) = item {
        for (key, value) in fields {
            scope.insert(format!("item.{key}"), value.clone());
        }
    }
    scope
}

/// Render one `ItemTemplate` against an already-built scope.
pub fn render_item_template(item_template: &ItemTemplate, scope: &StateMap) -> VNode {
    match item_template {
        ItemTemplate::Text { template_patch } => VNode::Text {
            content: render_template_patch(template_patch, scope),
        },
        ItemTemplate::Element {
            tag,
            props_templates,
            children_templates,
            key_binding,
        } => {
            let props = props_templates
                .as_ref()
                .map(|templates| {
                    templates
                        .iter()
                        .map(|(name, tp)| (name.clone(), render_template_patch(tp, scope)))
                        .collect()
                })
                .unwrap_or_default();
            let children = children_templates
                .as_ref()
                .map(|templates| templates.iter().map(|t| render_item_template(t, scope)).collect())
                .unwrap_or_default();
            let key = key_binding.as_ref().map(|binding| {
                scope
                    .get(binding)
                    .map(crate::format::format_value)
                    .unwrap_or_default()
            });
            VNode::Element {
                tag: tag.clone(),
                props,
                children,
                key,
            }
        }
    }
}

/// Read `state[loop.array_binding]`; if it is not an array, log and return
/// no nodes (§4.4: "if not an array, log and skip"). Otherwise render one
/// `VNode` per element, in order.
pub fn expand_loop(loop_template: &LoopTemplate, state: &StateMap) -> Vec<VNode> {
    let Some(array) = state.get(&loop_template.array_binding).and_then(Value::as_array) else {
        tracing::warn!(binding = loop_template.array_binding, "loop array binding is not an array, skipping");
        return Vec::new();
    };

    array
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let scope = build_scope(state, item, index, loop_template.index_var.as_deref());
            render_item_template(&loop_template.item_template, &scope)
        })
        .collect()
}
