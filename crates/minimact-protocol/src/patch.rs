//! Patches, paths, and the template variants that parameterize them.
//!
//! A `Path` is evaluated against the live DOM at apply time (§4.5); patches
//! within one batch are ordered by the server so that earlier edits never
//! invalidate a later path.

use crate::vnode::VNode;
use std::collections::BTreeMap;

/// An ordered sequence of child indices from the component root. `[]`
/// addresses the component root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// The parent path and the index within it, i.e. `path[:-1]` and
    /// `path[-1]` — used by `Create` to find the insertion point.
    pub fn split_last(&self) -> Option<(Path, usize)> {
        let (last, rest) = self.0.split_last()?;
        Some((Path(rest.to_vec()), *last))
    }
}

/// A binding from a template placeholder to a state slot, optionally with a
/// transform applied before substitution.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Binding {
    Key(String),
    Structured {
        #[serde(rename = "stateKey")]
        state_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<String>,
    },
}

impl Binding {
    pub fn state_key(&self) -> &str {
        match self {
            Binding::Key(k) => k,
            Binding::Structured { state_key, .. } => state_key,
        }
    }

    pub fn transform(&self) -> Option<&str> {
        match self {
            Binding::Key(_) => None,
            Binding::Structured { transform, .. } => transform.as_deref(),
        }
    }
}

/// A patch whose text content is parameterized and resolved against current
/// state at apply time (§3 `TemplatePatch`, §4.4).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemplatePatch {
    pub template: String,
    pub bindings: Vec<Binding>,
    /// Character offsets prior to substitution; advisory only, never read
    /// by the renderer.
    #[serde(default)]
    pub slots: Vec<usize>,
    #[serde(default, rename = "conditionalTemplates", skip_serializing_if = "Option::is_none")]
    pub conditional_templates: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "conditionalBindingIndex", skip_serializing_if = "Option::is_none")]
    pub conditional_binding_index: Option<usize>,
}

/// The recursive shape of one iteration of a `LoopTemplate`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ItemTemplate {
    Text {
        #[serde(rename = "templatePatch")]
        template_patch: TemplatePatch,
    },
    Element {
        tag: String,
        #[serde(default, rename = "propsTemplates", skip_serializing_if = "Option::is_none")]
        props_templates: Option<BTreeMap<String, TemplatePatch>>,
        #[serde(default, rename = "childrenTemplates", skip_serializing_if = "Option::is_none")]
        children_templates: Option<Vec<ItemTemplate>>,
        #[serde(default, rename = "keyBinding", skip_serializing_if = "Option::is_none")]
        key_binding: Option<String>,
    },
}

/// A patch that expands one array-valued state slot into a list of
/// concrete children (§4.4 "Loop expansion").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopTemplate {
    #[serde(rename = "arrayBinding")]
    pub array_binding: String,
    #[serde(rename = "itemTemplate")]
    pub item_template: ItemTemplate,
    #[serde(default, rename = "indexVar", skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// One structural edit, addressed by `Path`. A batch of these is applied in
/// order by `minimact-dom`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op")]
pub enum Patch {
    Create { path: Path, node: VNode },
    Remove { path: Path },
    Replace { path: Path, node: VNode },
    UpdateText { path: Path, content: String },
    UpdateProps { path: Path, props: BTreeMap<String, String> },
    ReorderChildren {
        path: Path,
        #[serde(rename = "keyOrder")]
        key_order: Vec<String>,
    },
    UpdateTextTemplate {
        path: Path,
        #[serde(rename = "templatePatch")]
        template_patch: TemplatePatch,
    },
    UpdatePropsTemplate {
        path: Path,
        #[serde(rename = "propName")]
        prop_name: String,
        #[serde(rename = "templatePatch")]
        template_patch: TemplatePatch,
    },
    UpdateListTemplate {
        path: Path,
        #[serde(rename = "loopTemplate")]
        loop_template: LoopTemplate,
    },
}

impl Patch {
    /// The path this patch is addressed at, regardless of variant.
    pub fn path(&self) -> &Path {
        match self {
            Patch::Create { path, .. }
            | Patch::Remove { path, .. }
            | Patch::Replace { path, .. }
            | Patch::UpdateText { path, .. }
            | Patch::UpdateProps { path, .. }
            | Patch::ReorderChildren { path, .. }
            | Patch::UpdateTextTemplate { path, .. }
            | Patch::UpdatePropsTemplate { path, .. }
            | Patch::UpdateListTemplate { path, .. } => path,
        }
    }

    /// Whether materializing this patch requires state — i.e. it is one of
    /// the `*Template` variants (used by the hint queue to derive `isTemplate`).
    pub fn is_template(&self) -> bool {
        matches!(
            self,
            Patch::UpdateTextTemplate { .. }
                | Patch::UpdatePropsTemplate { .. }
                | Patch::UpdateListTemplate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_split_last_finds_parent_and_index() {
        let path = Path(vec![0, 2, 1]);
        let (parent, index) = path.split_last().unwrap();
        assert_eq!(parent, Path(vec![0, 2]));
        assert_eq!(index, 1);
    }

    #[test]
    fn root_path_has_no_split() {
        assert!(Path::root().split_last().is_none());
    }

    #[test]
    fn string_binding_reads_as_key() {
        let b: Binding = serde_json::from_str("\"state_0\"").unwrap();
        assert_eq!(b.state_key(), "state_0");
        assert_eq!(b.transform(), None);
    }

    #[test]
    fn structured_binding_round_trips() {
        let b = Binding::Structured {
            state_key: "count".into(),
            transform: Some("toFixed(2)".into()),
        };
        let json = serde_json::to_string(&b).unwrap();
        let back: Binding = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }

    #[test]
    fn patch_variants_tag_on_op() {
        let patch = Patch::UpdateText {
            path: Path(vec![0, 0]),
            content: "1".into(),
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["op"], "UpdateText");
        assert_eq!(json["content"], "1");
    }

    #[test]
    fn is_template_only_true_for_template_variants() {
        assert!(!Patch::Remove { path: Path::root() }.is_template());
        assert!(Patch::UpdateTextTemplate {
            path: Path::root(),
            template_patch: TemplatePatch {
                template: "{0}".into(),
                bindings: vec![Binding::Key("a".into())],
                slots: vec![],
                conditional_templates: None,
                conditional_binding_index: None,
            },
        }
        .is_template());
    }
}
