//! Event delegation (§4.8): pure ancestor-walking and attribute-parsing
//! logic, kept free of any real listener so it's exercised by ordinary
//! tests against [`minimact_dom::MockDriver`]. The single capturing
//! listener itself — the part that actually needs a browser — lives in
//! [`crate::runtime`], gated to `wasm32`.

use minimact_dom::DomDriver;

/// The fixed event-type set the capturing listener is installed for (§4.8).
pub const DELEGATED_EVENT_TYPES: &[&str] = &[
    "click", "input", "change", "submit", "keydown", "keyup", "keypress", "mousedown", "mouseup",
    "mousemove", "mouseover", "mouseout", "focus", "blur",
];

/// A resolved delegated call, before argument assembly: the target carried
/// `"<method>[:arg1:arg2…]"` in its `data-on<event>` (or legacy `on<event>`)
/// attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerAttribute {
    pub method: String,
    pub args: Vec<String>,
}

/// Split `"Method:arg1:arg2"` into method name and colon-separated args.
pub fn parse_handler_attribute(raw: &str) -> HandlerAttribute {
    let mut parts = raw.split(':');
    let method = parts.next().unwrap_or_default().to_string();
    let args = parts.map(str::to_string).collect();
    HandlerAttribute { method, args }
}

/// Walk from `target` up through ancestors (inclusive) looking for the
/// nearest element carrying `data-on<event_name>` or legacy
/// `on<event_name>`. Returns the carrying node and its parsed handler.
pub fn find_handler<D: DomDriver>(
    driver: &D,
    target: &D::Node,
    event_name: &str,
) -> Option<(D::Node, HandlerAttribute)> {
    let data_attr = format!("data-on{event_name}");
    let legacy_attr = format!("on{event_name}");

    let mut current = target.clone();
    loop {
        if let Some(raw) = driver
            .get_attribute(&current, &data_attr)
            .or_else(|| driver.get_attribute(&current, &legacy_attr))
        {
            return Some((current, parse_handler_attribute(&raw)));
        }
        current = driver.parent_of(&current)?;
    }
}

/// Walk from `start` up through ancestors (inclusive) looking for the
/// nearest `data-minimact-component-id`.
pub fn find_component_id<D: DomDriver>(driver: &D, start: &D::Node) -> Option<String> {
    let mut current = start.clone();
    loop {
        if let Some(id) = driver.get_attribute(&current, "data-minimact-component-id") {
            return Some(id);
        }
        current = driver.parent_of(&current)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_dom::MockDriver;

    #[test]
    fn parses_method_and_colon_separated_args() {
        let parsed = parse_handler_attribute("UpdateItem:row-3:done");
        assert_eq!(parsed.method, "UpdateItem");
        assert_eq!(parsed.args, vec!["row-3", "done"]);
    }

    #[test]
    fn parses_bare_method_with_no_args() {
        let parsed = parse_handler_attribute("Inc");
        assert_eq!(parsed.method, "Inc");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn find_handler_walks_up_from_the_event_target() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let button = driver.create_element("button");
        driver.set_attribute(&button, "data-onclick", "Inc");
        let span = driver.create_element("span");
        driver.append_child(&button, span);
        driver.append_child(&root, button);

        let (handler_node, handler) = find_handler(&driver, &span, "click").unwrap();
        assert_eq!(handler_node, button);
        assert_eq!(handler.method, "Inc");
    }

    #[test]
    fn find_handler_falls_back_to_legacy_attribute() {
        let mut driver = MockDriver::new();
        let button = driver.create_element("button");
        driver.set_attribute(&button, "onclick", "Inc");

        let (_, handler) = find_handler(&driver, &button, "click").unwrap();
        assert_eq!(handler.method, "Inc");
    }

    #[test]
    fn find_handler_returns_none_when_no_ancestor_carries_it() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let span = driver.create_element("span");
        driver.append_child(&root, span);

        assert!(find_handler(&driver, &span, "click").is_none());
    }

    #[test]
    fn find_component_id_walks_up_past_the_handler_node() {
        let mut driver = MockDriver::new();
        let container = driver.create_element("div");
        driver.set_attribute(&container, "data-minimact-component-id", "c1");
        let button = driver.create_element("button");
        driver.append_child(&container, button);

        assert_eq!(find_component_id(&driver, &button), Some("c1".to_string()));
    }
}
