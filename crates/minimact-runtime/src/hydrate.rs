//! Hydration (§4.8): binding a [`ComponentContext`] to an existing
//! server-rendered subtree identified by `data-minimact-component`.

use crate::context::ComponentContext;
use minimact_dom::DomDriver;

const COMPONENT_ATTR: &str = "data-minimact-component";

/// Hydrate one container: read its component id and record its first
/// element child as the component root. Returns `None` (logged) if either
/// is missing.
pub fn hydrate_component<D: DomDriver>(driver: &D, container: &D::Node) -> Option<ComponentContext<D::Node>> {
    let Some(component_id) = driver.get_attribute(container, COMPONENT_ATTR) else {
        tracing::warn!("hydrate_component called on a node with no component attribute");
        return None;
    };
    let Some(root) = driver
        .children(container)
        .into_iter()
        .find(|child| driver.tag_name(child).is_some())
    else {
        tracing::warn!(component_id, "component container has no element child to use as root");
        return None;
    };
    Some(ComponentContext::new(component_id, root))
}

/// Find and hydrate every `data-minimact-component` container under
/// `document_root`, in document order.
pub fn hydrate_all<D: DomDriver>(driver: &D, document_root: &D::Node) -> Vec<ComponentContext<D::Node>> {
    driver
        .query_attribute(document_root, COMPONENT_ATTR)
        .iter()
        .filter_map(|container| hydrate_component(driver, container))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_dom::MockDriver;

    #[test]
    fn hydrate_component_records_id_and_first_element_child_as_root() {
        let mut driver = MockDriver::new();
        let container = driver.create_element("div");
        driver.set_attribute(&container, "data-minimact-component", "c1");
        let root = driver.create_element("div");
        driver.set_attribute(&root, "data-minimact-component-id", "c1");
        driver.append_child(&container, root);

        let ctx = hydrate_component(&driver, &container).unwrap();
        assert_eq!(ctx.component_id, "c1");
        assert_eq!(ctx.root, root);
    }

    #[test]
    fn hydrate_component_skips_containers_with_no_element_child() {
        let mut driver = MockDriver::new();
        let container = driver.create_element("div");
        driver.set_attribute(&container, "data-minimact-component", "c1");
        let text = driver.create_text("nothing to hydrate onto");
        driver.append_child(&container, text);

        assert!(hydrate_component(&driver, &container).is_none());
    }

    #[test]
    fn hydrate_all_finds_every_component_in_document_order() {
        let mut driver = MockDriver::new();
        let doc = driver.new_root();

        let c1 = driver.create_element("div");
        driver.set_attribute(&c1, "data-minimact-component", "c1");
        let c1_root = driver.create_element("div");
        driver.append_child(&c1, c1_root);

        let c2 = driver.create_element("div");
        driver.set_attribute(&c2, "data-minimact-component", "c2");
        let c2_root = driver.create_element("div");
        driver.append_child(&c2, c2_root);

        driver.append_child(&doc, c1);
        driver.append_child(&doc, c2);

        let contexts = hydrate_all(&driver, &doc);
        let ids: Vec<_> = contexts.iter().map(|c| c.component_id.clone()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}
