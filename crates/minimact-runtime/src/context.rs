//! Per-component state, recorded at hydration and mutated through setters
//! (§4.7). The Design Notes' "ambient context → explicit context" guidance
//! is applied literally here: there is no process-global current-component
//! pointer, only this struct, passed explicitly by the caller.

use minimact_dom::NodeHandle;
use minimact_protocol::{Binding, Path, StateMap, TemplatePatch};
use serde_json::Value;

/// A text or single-prop template bound to a state key, remembered the
/// first time the server sends it via an `UpdateTextTemplate`/
/// `UpdatePropsTemplate` patch, so later setter calls can re-render it
/// locally without waiting on the server (§4.7 step 5).
#[derive(Debug, Clone)]
pub enum BoundTemplateKind {
    Text(TemplatePatch),
    Prop { name: String, template: TemplatePatch },
}

#[derive(Debug, Clone)]
pub struct BoundTemplate {
    pub path: Path,
    pub kind: BoundTemplateKind,
}

impl BoundTemplate {
    fn bindings(&self) -> &[Binding] {
        match &self.kind {
            BoundTemplateKind::Text(tp) => &tp.bindings,
            BoundTemplateKind::Prop { template, .. } => &template.bindings,
        }
    }

    /// Whether a change to `state_key` should trigger this template to
    /// re-render.
    pub fn depends_on(&self, state_key: &str) -> bool {
        self.bindings().iter().any(|b| b.state_key() == state_key)
    }
}

/// A stable handle to one state slot. The `i`-th call to
/// [`ComponentContext::use_state`] during a component's setup binds to
/// `state_<i>` (§3) — the hook call order is what's stable, not any
/// identity carried by the value itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSlot {
    pub component_id: String,
    pub state_key: String,
}

/// One server-hydrated component: its id, DOM root, current state slots,
/// and the templates bound to those slots for the local fast path.
#[derive(Debug, Clone)]
pub struct ComponentContext<N: NodeHandle> {
    pub component_id: String,
    pub root: N,
    state: StateMap,
    next_slot: usize,
    bound_templates: Vec<BoundTemplate>,
}

impl<N: NodeHandle> ComponentContext<N> {
    pub fn new(component_id: impl Into<String>, root: N) -> Self {
        ComponentContext {
            component_id: component_id.into(),
            root,
            state: StateMap::new(),
            next_slot: 0,
            bound_templates: Vec::new(),
        }
    }

    /// Declare a state slot with its initial value, in call order. The
    /// returned [`StateSlot`] is the only way to build a setter for it.
    pub fn use_state(&mut self, initial: Value) -> StateSlot {
        let key = format!("state_{}", self.next_slot);
        self.next_slot += 1;
        self.state.insert(key.clone(), initial);
        StateSlot {
            component_id: self.component_id.clone(),
            state_key: key,
        }
    }

    pub fn bind_template(&mut self, template: BoundTemplate) {
        self.bound_templates.push(template);
    }

    pub fn state(&self) -> &StateMap {
        &self.state
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub(crate) fn set_raw(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
    }

    pub(crate) fn templates_depending_on<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a BoundTemplate> {
        self.bound_templates.iter().filter(move |t| t.depends_on(key))
    }
}
