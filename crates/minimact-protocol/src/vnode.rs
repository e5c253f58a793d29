//! The virtual-node model the server's patches are expressed against.
//!
//! `VNode` never diffs anything itself — the server computes and ships
//! patches pre-computed. This type exists purely so `Patch::Create` and
//! `Patch::Replace` have something to carry.

use std::collections::BTreeMap;

/// A node in the server's virtual-DOM tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum VNode {
    Element {
        tag: String,
        #[serde(default)]
        props: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<VNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    Text {
        content: String,
    },
    Fragment {
        #[serde(default)]
        children: Vec<VNode>,
    },
    RawHtml {
        html: String,
    },
}

impl VNode {
    pub fn element(tag: impl Into<String>, children: Vec<VNode>) -> Self {
        VNode::Element {
            tag: tag.into(),
            props: BTreeMap::new(),
            children,
            key: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text {
            content: content.into(),
        }
    }

    /// The `key` prop, if any — used by `ReorderChildren` and keyed loop
    /// rendering to find this node again after insertion.
    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}
