//! `renderTemplate` and `renderTemplatePatch` (§4.4).

use crate::format::format_value;
use crate::transform::apply_transform;
use minimact_protocol::{Binding, StateMap, TemplatePatch};
use serde_json::Value;

/// Replace each `{i}` placeholder in `tpl` with `format(params[i])`.
pub fn render_template(tpl: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(tpl.len());
    let mut chars = tpl.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let Some(close) = tpl[i + 1..].find('}') else {
            out.push(c);
            continue;
        };
        let inner = &tpl[i + 1..i + 1 + close];
        match inner.parse::<usize>() {
            Ok(index) => {
                let rendered = params
                    .get(index)
                    .map(format_value)
                    .unwrap_or_else(|| {
                        tracing::warn!(index, template = tpl, "missing binding, rendering empty");
                        String::new()
                    });
                out.push_str(&rendered);
                for _ in 0..=close {
                    chars.next();
                }
            }
            Err(_) => out.push(c),
        }
    }

    out
}

/// Resolve one binding against state: a plain string binding reads
/// `state[binding]`; a structured binding reads `state[stateKey]` and
/// applies its transform, if any.
pub fn resolve_binding(binding: &Binding, state: &StateMap) -> Value {
    let raw = state.get(binding.state_key()).cloned().unwrap_or_else(|| {
        tracing::warn!(key = binding.state_key(), "missing binding, rendering empty");
        Value::Null
    });
    match binding.transform() {
        Some(transform) => apply_transform(&raw, transform),
        None => raw,
    }
}

/// Resolve a `TemplatePatch` to its final string, including conditional
/// sub-template selection (§4.4).
pub fn render_template_patch(tp: &TemplatePatch, state: &StateMap) -> String {
    let values: Vec<Value> = tp.bindings.iter().map(|b| resolve_binding(b, state)).collect();

    let template = match &tp.conditional_templates {
        Some(branches) => {
            let key_index = tp.conditional_binding_index.unwrap_or(0);
            let key_value = values.get(key_index).cloned().unwrap_or(Value::Null);
            let key = format_value(&key_value);
            match branches.get(&key) {
                Some(branch) => branch.as_str(),
                None => {
                    tracing::warn!(key, "no conditional template for key, rendering empty");
                    ""
                }
            }
        }
        None => tp.template.as_str(),
    };

    render_template(template, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_protocol::Binding;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn state(pairs: &[(&str, Value)]) -> StateMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<BTreeMap<_, _>>()
    }

    #[test]
    fn replaces_placeholders_in_order() {
        assert_eq!(render_template("{0} of {1}", &[json!("a"), json!("b")]), "a of b");
    }

    #[test]
    fn missing_param_renders_empty() {
        assert_eq!(render_template("{0}", &[]), "");
    }

    #[test]
    fn scenario_counter_local_echo() {
        let tp = TemplatePatch {
            template: "{0}".into(),
            bindings: vec![Binding::Key("state_0".into())],
            slots: vec![0],
            conditional_templates: None,
            conditional_binding_index: None,
        };
        let st = state(&[("state_0", json!(1))]);
        assert_eq!(render_template_patch(&tp, &st), "1");
    }

    #[test]
    fn scenario_conditional_template() {
        let tp = TemplatePatch {
            template: "{0}".into(),
            bindings: vec![Binding::Key("isOn".into())],
            slots: vec![],
            conditional_templates: Some(BTreeMap::from([
                ("true".to_string(), "ON".to_string()),
                ("false".to_string(), "OFF".to_string()),
            ])),
            conditional_binding_index: Some(0),
        };
        let st = state(&[("isOn", json!(true))]);
        assert_eq!(render_template_patch(&tp, &st), "ON");
    }

    #[test]
    fn no_unresolved_placeholders_when_all_bindings_present() {
        let tp = TemplatePatch {
            template: "{0}-{1}".into(),
            bindings: vec![Binding::Key("a".into()), Binding::Key("b".into())],
            slots: vec![],
            conditional_templates: None,
            conditional_binding_index: None,
        };
        let st = state(&[("a", json!(1)), ("b", json!(2))]);
        let rendered = render_template_patch(&tp, &st);
        assert!(!rendered.contains('{'));
    }
}
