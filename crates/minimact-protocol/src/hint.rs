//! The predictive hint record (§3 `Hint`).

use crate::patch::Patch;
use std::collections::BTreeMap;

/// A server-computed patch batch keyed to a predicted future state
/// transition, queued ahead of the event that would trigger it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Hint {
    #[serde(rename = "componentId")]
    pub component_id: String,
    #[serde(rename = "hintId")]
    pub hint_id: String,
    pub patches: Vec<Patch>,
    pub confidence: f64,
    #[serde(rename = "predictedState")]
    pub predicted_state: BTreeMap<String, serde_json::Value>,
    /// Millis since the embedding page's time origin (`performance.now()`),
    /// stamped by `minimact-hints` on insertion — not trusted from the wire.
    #[serde(default, skip_serializing, rename = "queuedAt")]
    pub queued_at: f64,
    /// Derived by scanning `patches` for any `*Template` variant; not
    /// trusted from the wire either (`minimact-hints` recomputes it).
    #[serde(default, skip_serializing, rename = "isTemplate")]
    pub is_template: bool,
}

impl Hint {
    /// The queue key this hint is stored and looked up under.
    pub fn key(&self) -> String {
        format!("{}:{}", self.component_id, self.hint_id)
    }
}
