//! Turning a [`VNode`] into live nodes via a [`DomDriver`] (§4.3).

use crate::driver::DomDriver;
use minimact_protocol::VNode;
#[cfg(test)]
use std::collections::BTreeMap;

/// `className`/`class` both address the element's `class` attribute.
fn is_class_prop(name: &str) -> bool {
    name == "className" || name == "class"
}

/// `on<Event>`: an uppercase letter right after `on`. Distinguishes it from
/// an unrelated prop that merely starts with "on" (e.g. `online`).
fn event_prop_name(name: &str) -> Option<&str> {
    let rest = name.strip_prefix("on")?;
    let first = rest.chars().next()?;
    first.is_ascii_uppercase().then_some(rest)
}

/// The attribute name a prop named `name` materializes to, per §4.3's
/// conventions. `UpdateProps` uses this to decide which current attributes
/// the new props still account for.
pub(crate) fn materialized_attr_name(name: &str) -> String {
    if is_class_prop(name) {
        "class".to_string()
    } else if let Some(event) = event_prop_name(name) {
        format!("data-on{}", event.to_ascii_lowercase())
    } else if name == "key" {
        "data-key".to_string()
    } else {
        name.to_string()
    }
}

pub(crate) fn set_prop<D: DomDriver>(driver: &mut D, node: &D::Node, name: &str, value: &str) {
    driver.set_attribute(node, &materialized_attr_name(name), value);
}

/// Set a single prop on an already-materialized node, applying the same
/// name-mapping conventions as full materialization (§4.3). Used by the
/// runtime's local template fast path (§4.7 step 5), which updates one
/// attribute at a time rather than replaying a whole `Patch`.
pub fn set_materialized_prop<D: DomDriver>(driver: &mut D, node: &D::Node, name: &str, value: &str) {
    set_prop(driver, node, name, value);
}

/// Materialize `vnode` into a live node via `driver`, recursively.
pub fn materialize<D: DomDriver>(driver: &mut D, vnode: &VNode) -> D::Node {
    match vnode {
        VNode::Text { content } => driver.create_text(content),
        VNode::Element { tag, props, children, key } => {
            let node = driver.create_element(tag);
            for (name, value) in props {
                set_prop(driver, &node, name, value);
            }
            if let Some(key) = key {
                driver.set_attribute(&node, "data-key", key);
            }
            for child in children {
                let child_node = materialize(driver, child);
                driver.append_child(&node, child_node);
            }
            node
        }
        VNode::Fragment { children } => {
            let node = driver.create_fragment();
            for child in children {
                let child_node = materialize(driver, child);
                driver.append_child(&node, child_node);
            }
            node
        }
        VNode::RawHtml { html } => {
            let node = driver.create_element("div");
            driver.set_inner_html(&node, html);
            node
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    fn element(tag: &str, props: &[(&str, &str)], children: Vec<VNode>, key: Option<&str>) -> VNode {
        VNode::Element {
            tag: tag.into(),
            props: props.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
            children,
            key: key.map(String::from),
        }
    }

    #[test]
    fn on_click_is_mirrored_to_data_on_click_not_a_live_listener() {
        let mut driver = MockDriver::new();
        let vnode = element("button", &[("onClick", "increment")], vec![], None);
        let node = materialize(&mut driver, &vnode);
        assert_eq!(driver.attribute(node, "data-onclick"), Some("increment"));
        assert_eq!(driver.attribute(node, "onClick"), None);
    }

    #[test]
    fn class_name_prop_becomes_class_attribute() {
        let mut driver = MockDriver::new();
        let vnode = element("div", &[("className", "card")], vec![], None);
        let node = materialize(&mut driver, &vnode);
        assert_eq!(driver.attribute(node, "class"), Some("card"));
    }

    #[test]
    fn key_prop_mirrors_to_data_key() {
        let mut driver = MockDriver::new();
        let vnode = element("li", &[], vec![], Some("row-1"));
        let node = materialize(&mut driver, &vnode);
        assert_eq!(driver.attribute(node, "data-key"), Some("row-1"));
    }

    #[test]
    fn raw_html_wraps_in_an_element_with_inner_html_set() {
        let mut driver = MockDriver::new();
        let vnode = VNode::RawHtml { html: "<b>hi</b>".into() };
        let node = materialize(&mut driver, &vnode);
        assert_eq!(driver.tag_of(node), Some("div"));
        assert_eq!(driver.text_of(node), "<b>hi</b>");
    }

    #[test]
    fn fragment_materializes_all_children_without_a_wrapper_tag() {
        let mut driver = MockDriver::new();
        let vnode = VNode::Fragment {
            children: vec![VNode::text("a"), VNode::text("b")],
        };
        let node = materialize(&mut driver, &vnode);
        assert_eq!(driver.child_count(&node), 2);
    }
}
