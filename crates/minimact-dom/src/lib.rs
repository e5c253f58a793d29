//! VNode materialization and DOM patch application (§4.3, §4.5).
//!
//! Both steps go through [`DomDriver`], an abstraction over the live
//! document, so they're covered by ordinary synchronous tests via
//! [`mock::MockDriver`] instead of a browser-hosted test runner.

pub mod browser;
pub mod driver;
pub mod materialize;
pub mod mock;
pub mod patcher;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserDriver;
pub use driver::{DomDriver, NodeHandle};
pub use materialize::{materialize, set_materialized_prop};
pub use mock::MockDriver;
pub use patcher::{apply_patches, replace_html, resolve_path};
