//! Abstraction over the live DOM so [`crate::patcher::apply_patches`] and
//! [`crate::materialize`] are exercised by ordinary unit tests without a
//! browser, mirroring how the transport crate hides `web_sys::WebSocket`
//! behind `Socket`.

/// A handle to a node owned by a [`DomDriver`]. Cheap to clone (an index or
/// a reference-counted `web_sys::Node`, depending on the implementation).
pub trait NodeHandle: Clone + PartialEq + std::fmt::Debug {}
impl<T: Clone + PartialEq + std::fmt::Debug> NodeHandle for T {}

pub trait DomDriver {
    type Node: NodeHandle;

    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn create_text(&mut self, content: &str) -> Self::Node;
    fn create_fragment(&mut self) -> Self::Node;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);
    /// Every attribute name currently set on `node`.
    fn attribute_names(&self, node: &Self::Node) -> Vec<String>;
    fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    /// The element tag name, lowercased, or `None` for a text/fragment node.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    /// Every descendant of `root` (`root` included) carrying the attribute
    /// `name`, in document order. Hydration uses this to find every
    /// `data-minimact-component` container without the caller needing to
    /// walk the tree itself.
    fn query_attribute(&self, root: &Self::Node, name: &str) -> Vec<Self::Node>;

    fn set_text_content(&mut self, node: &Self::Node, text: &str);
    fn set_inner_html(&mut self, node: &Self::Node, html: &str);

    fn append_child(&mut self, parent: &Self::Node, child: Self::Node);
    /// Insert `child` at `index`, appending if `index` is past the current
    /// end (§4.5 `Create`).
    fn insert_child_at(&mut self, parent: &Self::Node, index: usize, child: Self::Node);
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
    fn replace_child(&mut self, parent: &Self::Node, old: &Self::Node, new: Self::Node);
    fn clear_children(&mut self, node: &Self::Node);

    fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;
    fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;
    fn child_count(&self, node: &Self::Node) -> usize;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    /// `data-key`, falling back to a `key` attribute, for `ReorderChildren`.
    fn key_of(&self, node: &Self::Node) -> Option<String>;
}
