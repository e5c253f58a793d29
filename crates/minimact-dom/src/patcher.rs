//! Applying a batch of already-materialized [`Patch`]es to the live DOM
//! (§4.5). `Patch`'s three `*Template` variants must be run through
//! `minimact_template::materialize_patch` before reaching this module —
//! `apply_patches` only knows the six concrete variants plus the two
//! inert ones it can't act on directly (`UpdateListTemplate` etc. would be
//! a caller bug, logged and skipped like any other unresolvable patch).

use crate::driver::DomDriver;
use crate::materialize::{materialize, materialized_attr_name, set_prop};
use minimact_protocol::{Patch, Path};
use std::collections::BTreeSet;

/// Attributes whose prefix marks them as minimact's own bookkeeping, never
/// touched by `UpdateProps`'s "remove anything not in the new props" pass.
const PRESERVED_ATTR_PREFIX: &str = "data-minimact-";

/// Resolve `path` against `root` by descending child indices. Exposed for
/// callers outside the patcher (the runtime's local template fast path,
/// §4.7 step 5) that need to locate a previously-patched node without going
/// through a full `Patch` batch.
pub fn resolve_path<D: DomDriver>(driver: &D, root: &D::Node, path: &Path) -> Option<D::Node> {
    walk(driver, root, path)
}

fn walk<D: DomDriver>(driver: &D, root: &D::Node, path: &Path) -> Option<D::Node> {
    let mut current = root.clone();
    for &index in &path.0 {
        current = driver.child_at(&current, index)?;
    }
    Some(current)
}

/// Apply `patches` to `root` in order. A patch whose target can't be
/// resolved (and isn't `Create`) is logged and skipped; the rest continue.
pub fn apply_patches<D: DomDriver>(driver: &mut D, root: &D::Node, patches: &[Patch]) {
    for patch in patches {
        apply_one(driver, root, patch);
    }
}

fn apply_one<D: DomDriver>(driver: &mut D, root: &D::Node, patch: &Patch) {
    match patch {
        Patch::Create { path, node } => apply_create(driver, root, path, node),
        Patch::Remove { path } => {
            let Some(target) = walk(driver, root, path) else {
                tracing::warn!(?path, "Remove: target not found, skipping");
                return;
            };
            let Some(parent) = driver.parent_of(&target) else {
                tracing::warn!(?path, "Remove: target has no parent, skipping");
                return;
            };
            driver.remove_child(&parent, &target);
        }
        Patch::Replace { path, node } => {
            let Some(target) = walk(driver, root, path) else {
                tracing::warn!(?path, "Replace: target not found, skipping");
                return;
            };
            let Some(parent) = driver.parent_of(&target) else {
                tracing::warn!(?path, "Replace: target has no parent, skipping");
                return;
            };
            let materialized = materialize(driver, node);
            driver.replace_child(&parent, &target, materialized);
        }
        Patch::UpdateText { path, content } => {
            let Some(target) = walk(driver, root, path) else {
                tracing::warn!(?path, "UpdateText: target not found, skipping");
                return;
            };
            driver.set_text_content(&target, content);
        }
        Patch::UpdateProps { path, props } => {
            let Some(target) = walk(driver, root, path) else {
                tracing::warn!(?path, "UpdateProps: target not found, skipping");
                return;
            };
            let current: BTreeSet<String> = driver.attribute_names(&target).into_iter().collect();
            let wanted_attrs: BTreeSet<String> = props.keys().map(|name| materialized_attr_name(name)).collect();
            for name in &current {
                if name.starts_with(PRESERVED_ATTR_PREFIX) {
                    continue;
                }
                if !wanted_attrs.contains(name) {
                    driver.remove_attribute(&target, name);
                }
            }
            for (name, value) in props {
                set_prop(driver, &target, name, value);
            }
        }
        Patch::ReorderChildren { path, key_order } => {
            let Some(target) = walk(driver, root, path) else {
                tracing::warn!(?path, "ReorderChildren: target not found, skipping");
                return;
            };
            apply_reorder(driver, &target, key_order);
        }
        Patch::UpdateTextTemplate { .. } | Patch::UpdatePropsTemplate { .. } | Patch::UpdateListTemplate { .. } => {
            tracing::warn!(?patch, "template patch reached the DOM patcher unmaterialized, skipping");
        }
    }
}

fn apply_create<D: DomDriver>(driver: &mut D, root: &D::Node, path: &Path, node: &minimact_protocol::VNode) {
    let materialized = materialize(driver, node);
    if path.0.is_empty() {
        driver.clear_children(root);
        driver.append_child(root, materialized);
        return;
    }
    let Some((parent_path, index)) = path.split_last() else {
        driver.append_child(root, materialized);
        return;
    };
    let Some(parent) = walk(driver, root, &parent_path) else {
        tracing::warn!(?path, "Create: parent not found, skipping");
        return;
    };
    driver.insert_child_at(&parent, index, materialized);
}

/// Escape hatch for when the server serves a full-component replacement
/// rather than a patch batch: clear `root` and set raw HTML on it directly.
pub fn replace_html<D: DomDriver>(driver: &mut D, root: &D::Node, html: &str) {
    driver.clear_children(root);
    driver.set_inner_html(root, html);
}

/// Build a key→child map from `data-key`, then walk the requested order
/// inserting each keyed child before whatever currently sits at that
/// position, if it isn't already there (§4.5).
fn apply_reorder<D: DomDriver>(driver: &mut D, parent: &D::Node, order: &[String]) {
    let mut by_key = std::collections::HashMap::new();
    for child in driver.children(parent) {
        if let Some(key) = driver.key_of(&child) {
            by_key.insert(key, child);
        }
    }

    for (index, key) in order.iter().enumerate() {
        let Some(keyed_child) = by_key.get(key).cloned() else {
            tracing::warn!(key, "ReorderChildren: no child with this key, skipping entry");
            continue;
        };
        let current_at_index = driver.child_at(parent, index);
        if current_at_index.as_ref() != Some(&keyed_child) {
            driver.insert_child_at(parent, index, keyed_child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use minimact_protocol::VNode;
    use std::collections::BTreeMap;

    #[test]
    fn create_at_root_clears_and_appends() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let old_child = driver.create_element("p");
        driver.append_child(&root, old_child);

        let patch = Patch::Create { path: Path::root(), node: VNode::text("hello") };
        apply_patches(&mut driver, &root, &[patch]);

        assert_eq!(driver.child_count(&root), 1);
        let new_child = driver.child_at(&root, 0).unwrap();
        assert_eq!(driver.text_of(new_child), "hello");
    }

    #[test]
    fn create_at_child_path_inserts_at_index() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let a = driver.create_text("a");
        let c = driver.create_text("c");
        driver.append_child(&root, a);
        driver.append_child(&root, c);

        let patch = Patch::Create { path: Path(vec![1]), node: VNode::text("b") };
        apply_patches(&mut driver, &root, &[patch]);

        let texts: Vec<_> = driver.children(&root).iter().map(|n| driver.text_of(*n).to_string()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_detaches_the_target() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let child = driver.create_text("gone");
        driver.append_child(&root, child);

        apply_patches(&mut driver, &root, &[Patch::Remove { path: Path(vec![0]) }]);
        assert_eq!(driver.child_count(&root), 0);
    }

    #[test]
    fn update_text_sets_text_content_by_path() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let child = driver.create_text("old");
        driver.append_child(&root, child);

        apply_patches(&mut driver, &root, &[Patch::UpdateText { path: Path(vec![0]), content: "new".into() }]);
        assert_eq!(driver.text_of(driver.child_at(&root, 0).unwrap()), "new");
    }

    #[test]
    fn update_props_removes_stale_attrs_and_preserves_minimact_bookkeeping() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let child = driver.create_element("div");
        driver.set_attribute(&child, "class", "old");
        driver.set_attribute(&child, "data-minimact-component-id", "c1");
        driver.append_child(&root, child);

        let mut props = BTreeMap::new();
        props.insert("id".to_string(), "new-id".to_string());
        apply_patches(&mut driver, &root, &[Patch::UpdateProps { path: Path(vec![0]), props }]);

        let target = driver.child_at(&root, 0).unwrap();
        assert_eq!(driver.attribute(target, "class"), None);
        assert_eq!(driver.attribute(target, "data-minimact-component-id"), Some("c1"));
        assert_eq!(driver.attribute(target, "id"), Some("new-id"));
    }

    #[test]
    fn update_props_keeps_class_when_class_name_is_resent() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let child = driver.create_element("div");
        driver.set_attribute(&child, "class", "old");
        driver.append_child(&root, child);

        let mut props = BTreeMap::new();
        props.insert("className".to_string(), "new".to_string());
        apply_patches(&mut driver, &root, &[Patch::UpdateProps { path: Path(vec![0]), props }]);

        let target = driver.child_at(&root, 0).unwrap();
        assert_eq!(driver.attribute(target, "class"), Some("new"));
    }

    #[test]
    fn reorder_children_moves_keyed_nodes_into_requested_order() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let a = driver.create_element("li");
        driver.set_attribute(&a, "data-key", "a");
        let b = driver.create_element("li");
        driver.set_attribute(&b, "data-key", "b");
        driver.append_child(&root, a);
        driver.append_child(&root, b);

        apply_patches(&mut driver, &root, &[Patch::ReorderChildren {
            path: Path::root(),
            key_order: vec!["b".to_string(), "a".to_string()],
        }]);

        let keys: Vec<_> = driver.children(&root).iter().map(|n| driver.key_of(n).unwrap()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn unresolvable_path_is_skipped_without_aborting_the_batch() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();

        apply_patches(&mut driver, &root, &[
            Patch::UpdateText { path: Path(vec![5]), content: "nope".into() },
            Patch::Create { path: Path::root(), node: VNode::text("still applied") },
        ]);

        assert_eq!(driver.child_count(&root), 1);
    }

    #[test]
    fn replace_html_clears_and_sets_inner_html() {
        let mut driver = MockDriver::new();
        let root = driver.new_root();
        let old_child = driver.create_text("old");
        driver.append_child(&root, old_child);

        replace_html(&mut driver, &root, "<p>new</p>");

        assert_eq!(driver.child_count(&root), 0);
        assert_eq!(driver.text_of(root), "<p>new</p>");
    }
}
