//! The real [`DomDriver`] backed by `web_sys`, wrapping `window().document()`.
//! WASM is single-threaded, so there's no need for `Arc`/`Mutex` here.

#![cfg(target_arch = "wasm32")]

use crate::driver::DomDriver;
use wasm_bindgen::JsCast;

/// Materializes/patches the live document via `web_sys`.
pub struct BrowserDriver {
    document: web_sys::Document,
}

impl BrowserDriver {
    pub fn new() -> Result<Self, wasm_bindgen::JsValue> {
        let window = web_sys::window().ok_or_else(|| wasm_bindgen::JsValue::from_str("no window"))?;
        let document = window.document().ok_or_else(|| wasm_bindgen::JsValue::from_str("no document"))?;
        Ok(BrowserDriver { document })
    }

    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }
}

impl DomDriver for BrowserDriver {
    type Node = web_sys::Node;

    fn create_element(&mut self, tag: &str) -> web_sys::Node {
        self.document
            .create_element(tag)
            .expect("create_element")
            .into()
    }

    fn create_text(&mut self, content: &str) -> web_sys::Node {
        self.document.create_text_node(content).into()
    }

    fn create_fragment(&mut self) -> web_sys::Node {
        self.document.create_document_fragment().into()
    }

    fn set_attribute(&mut self, node: &web_sys::Node, name: &str, value: &str) {
        let Some(element) = node.dyn_ref::<web_sys::Element>() else {
            tracing::warn!(name, "set_attribute on a non-element node, skipping");
            return;
        };
        if element.set_attribute(name, value).is_err() {
            tracing::warn!(name, "set_attribute failed");
        }
    }

    fn remove_attribute(&mut self, node: &web_sys::Node, name: &str) {
        if let Some(element) = node.dyn_ref::<web_sys::Element>() {
            let _ = element.remove_attribute(name);
        }
    }

    fn attribute_names(&self, node: &web_sys::Node) -> Vec<String> {
        let Some(element) = node.dyn_ref::<web_sys::Element>() else {
            return Vec::new();
        };
        let names = element.get_attribute_names();
        (0..names.length())
            .filter_map(|i| names.get(i).as_string())
            .collect()
    }

    fn get_attribute(&self, node: &web_sys::Node, name: &str) -> Option<String> {
        node.dyn_ref::<web_sys::Element>()?.get_attribute(name)
    }

    fn tag_name(&self, node: &web_sys::Node) -> Option<String> {
        let element = node.dyn_ref::<web_sys::Element>()?;
        Some(element.tag_name().to_lowercase())
    }

    fn query_attribute(&self, root: &web_sys::Node, name: &str) -> Vec<web_sys::Node> {
        let Some(element) = root.dyn_ref::<web_sys::Element>() else {
            return Vec::new();
        };
        let selector = format!("[{name}]");
        let Ok(list) = element.query_selector_all(&selector) else {
            return Vec::new();
        };
        let mut found: Vec<web_sys::Node> = (0..list.length()).filter_map(|i| list.get(i)).collect();
        if element.has_attribute(name) {
            found.insert(0, root.clone());
        }
        found
    }

    fn set_text_content(&mut self, node: &web_sys::Node, text: &str) {
        node.set_text_content(Some(text));
    }

    fn set_inner_html(&mut self, node: &web_sys::Node, html: &str) {
        if let Some(element) = node.dyn_ref::<web_sys::Element>() {
            element.set_inner_html(html);
        } else {
            tracing::warn!("set_inner_html on a non-element node, skipping");
        }
    }

    fn append_child(&mut self, parent: &web_sys::Node, child: web_sys::Node) {
        let _ = parent.append_child(&child);
    }

    fn insert_child_at(&mut self, parent: &web_sys::Node, index: usize, child: web_sys::Node) {
        let reference = parent.child_nodes().get(index as u32);
        let _ = parent.insert_before(&child, reference.as_ref());
    }

    fn remove_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) {
        let _ = parent.remove_child(child);
    }

    fn replace_child(&mut self, parent: &web_sys::Node, old: &web_sys::Node, new: web_sys::Node) {
        let _ = parent.replace_child(&new, old);
    }

    fn clear_children(&mut self, node: &web_sys::Node) {
        while let Some(child) = node.first_child() {
            let _ = node.remove_child(&child);
        }
    }

    fn parent_of(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
        node.parent_node()
    }

    fn child_at(&self, node: &web_sys::Node, index: usize) -> Option<web_sys::Node> {
        node.child_nodes().get(index as u32)
    }

    fn child_count(&self, node: &web_sys::Node) -> usize {
        node.child_nodes().length() as usize
    }

    fn children(&self, node: &web_sys::Node) -> Vec<web_sys::Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn key_of(&self, node: &web_sys::Node) -> Option<String> {
        let element = node.dyn_ref::<web_sys::Element>()?;
        element
            .get_attribute("data-key")
            .or_else(|| element.get_attribute("key"))
    }
}
