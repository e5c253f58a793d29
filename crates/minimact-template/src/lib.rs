//! Template substitution, the transform whitelist, and loop expansion
//! (§4.4). Pure functions only — no DOM, no I/O; `minimact-dom` calls
//! into [`materialize_patch`] before applying a batch.

mod format;
mod loop_render;
mod materialize;
mod render;
mod transform;

pub use format::format_value;
pub use loop_render::{expand_loop, render_item_template};
pub use materialize::{materialize_patch, materialize_patches};
pub use render::{render_template, render_template_patch, resolve_binding};
pub use transform::apply_transform;
