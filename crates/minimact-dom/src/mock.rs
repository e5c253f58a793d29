//! An in-memory arena tree standing in for the live DOM in tests.

use crate::driver::DomDriver;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Kind {
    Element { tag: String },
    Text,
    Fragment,
}

#[derive(Debug, Clone)]
struct MockNode {
    kind: Kind,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// A mock DOM. `MockDriver::document()` is the implicit root every test
/// tree hangs off of.
#[derive(Debug, Default)]
pub struct MockDriver {
    nodes: Vec<MockNode>,
}

impl MockDriver {
    pub fn new() -> Self {
        MockDriver { nodes: Vec::new() }
    }

    fn alloc(&mut self, node: MockNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn get(&self, id: NodeId) -> &MockNode {
        &self.nodes[id.0]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut MockNode {
        &mut self.nodes[id.0]
    }

    pub fn tag_of(&self, id: NodeId) -> Option<&str> {
        match &self.get(id).kind {
            Kind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn text_of(&self, id: NodeId) -> &str {
        &self.get(id).text
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).attrs.get(name).map(String::as_str)
    }

    pub fn new_root(&mut self) -> NodeId {
        self.alloc(MockNode {
            kind: Kind::Element { tag: "#root".into() },
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.get(id).parent {
            self.get_mut(parent).children.retain(|c| *c != id);
        }
        self.get_mut(id).parent = None;
    }

    fn collect_attribute(&self, node: NodeId, name: &str, found: &mut Vec<NodeId>) {
        if self.get(node).attrs.contains_key(name) {
            found.push(node);
        }
        for child in self.get(node).children.clone() {
            self.collect_attribute(child, name, found);
        }
    }
}

impl DomDriver for MockDriver {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(MockNode {
            kind: Kind::Element { tag: tag.to_string() },
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(MockNode {
            kind: Kind::Text,
            attrs: BTreeMap::new(),
            text: content.to_string(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn create_fragment(&mut self) -> NodeId {
        self.alloc(MockNode {
            kind: Kind::Fragment,
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.get_mut(*node).attrs.insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        self.get_mut(*node).attrs.remove(name);
    }

    fn attribute_names(&self, node: &NodeId) -> Vec<String> {
        self.get(*node).attrs.keys().cloned().collect()
    }

    fn get_attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.get(*node).attrs.get(name).cloned()
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        match &self.get(*node).kind {
            Kind::Element { tag } => Some(tag.clone()),
            _ => None,
        }
    }

    fn query_attribute(&self, root: &NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_attribute(*root, name, &mut found);
        found
    }

    fn set_text_content(&mut self, node: &NodeId, text: &str) {
        let n = self.get_mut(*node);
        n.text = text.to_string();
        n.children.clear();
    }

    fn set_inner_html(&mut self, node: &NodeId, html: &str) {
        self.get_mut(*node).text = html.to_string();
    }

    fn append_child(&mut self, parent: &NodeId, child: NodeId) {
        self.get_mut(child).parent = Some(*parent);
        self.get_mut(*parent).children.push(child);
    }

    fn insert_child_at(&mut self, parent: &NodeId, index: usize, child: NodeId) {
        // Mirrors `Node.insertBefore`: inserting a node already in the tree
        // moves it rather than duplicating it.
        self.detach(child);
        self.get_mut(child).parent = Some(*parent);
        let children = &mut self.get_mut(*parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    fn remove_child(&mut self, _parent: &NodeId, child: &NodeId) {
        self.detach(*child);
    }

    fn replace_child(&mut self, parent: &NodeId, old: &NodeId, new: NodeId) {
        self.get_mut(new).parent = Some(*parent);
        let children = &mut self.get_mut(*parent).children;
        if let Some(pos) = children.iter().position(|c| c == old) {
            children[pos] = new;
        }
        self.get_mut(*old).parent = None;
    }

    fn clear_children(&mut self, node: &NodeId) {
        let children = std::mem::take(&mut self.get_mut(*node).children);
        for child in children {
            self.get_mut(child).parent = None;
        }
    }

    fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
        self.get(*node).parent
    }

    fn child_at(&self, node: &NodeId, index: usize) -> Option<NodeId> {
        self.get(*node).children.get(index).copied()
    }

    fn child_count(&self, node: &NodeId) -> usize {
        self.get(*node).children.len()
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.get(*node).children.clone()
    }

    fn key_of(&self, node: &NodeId) -> Option<String> {
        self.get(*node)
            .attrs
            .get("data-key")
            .or_else(|| self.get(*node).attrs.get("key"))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_attribute_finds_matching_descendants_including_root() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        driver.set_attribute(&root, "data-minimact-component", "outer");
        let inner = driver.create_element("div");
        driver.set_attribute(&inner, "data-minimact-component", "inner");
        let unrelated = driver.create_element("span");
        driver.append_child(&root, inner);
        driver.append_child(&root, unrelated);

        let found = driver.query_attribute(&root, "data-minimact-component");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&root));
        assert!(found.contains(&inner));
    }

    #[test]
    fn tag_name_is_none_for_text_nodes() {
        let mut driver = MockDriver::new();
        let text = driver.create_text("hi");
        let element = driver.create_element("p");
        assert_eq!(driver.tag_name(&text), None);
        assert_eq!(driver.tag_name(&element), Some("p".to_string()));
    }
}
