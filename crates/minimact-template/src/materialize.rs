//! Turning a (possibly templated) `Patch` into a batch of concrete patches
//! (§4.4 `materializePatch`).

use crate::loop_render::expand_loop;
use crate::render::render_template_patch;
use minimact_protocol::{Patch, StateMap};
use std::collections::BTreeMap;

/// Materialize one patch against `state`. Non-template variants pass
/// through unchanged as a single-element batch; `UpdateListTemplate`
/// expands into one `Create` per array element, at successive child
/// indices of `patch.path()`.
pub fn materialize_patch(patch: &Patch, state: &StateMap) -> Vec<Patch> {
    match patch {
        Patch::UpdateTextTemplate { path, template_patch } => vec![Patch::UpdateText {
            path: path.clone(),
            content: render_template_patch(template_patch, state),
        }],
        Patch::UpdatePropsTemplate {
            path,
            prop_name,
            template_patch,
        } => {
            let mut props = BTreeMap::new();
            props.insert(prop_name.clone(), render_template_patch(template_patch, state));
            vec![Patch::UpdateProps {
                path: path.clone(),
                props,
            }]
        }
        Patch::UpdateListTemplate { path, loop_template } => expand_loop(loop_template, state)
            .into_iter()
            .enumerate()
            .map(|(index, node)| Patch::Create {
                path: path.child(index),
                node,
            })
            .collect(),
        concrete => vec![concrete.clone()],
    }
}

/// Materialize a whole batch in order, flattening list expansions.
pub fn materialize_patches(patches: &[Patch], state: &StateMap) -> Vec<Patch> {
    patches.iter().flat_map(|p| materialize_patch(p, state)).collect()
}
