//! The predictive hint queue (§4.6).
//!
//! A process-wide keyed cache of predicted patches, evicted by TTL and
//! consumed on first match. No weak references or background sweeper are
//! needed — `queue_hint`/`match_hint` both sweep expired entries inline, and
//! explicit `clear_component`/`clear_all` handle component teardown
//! (Design Notes, "Ownership of the hint queue").

use indexmap::IndexMap;
use minimact_protocol::{Hint, Patch, StateMap};
use serde_json::Value;

/// Default time-to-live for a queued hint, in milliseconds (§3).
pub const DEFAULT_TTL_MS: f64 = 5_000.0;

#[derive(Debug, Clone, Copy)]
pub struct HintQueueOptions {
    pub ttl_ms: f64,
}

impl Default for HintQueueOptions {
    fn default() -> Self {
        HintQueueOptions { ttl_ms: DEFAULT_TTL_MS }
    }
}

/// The result of a successful `match_hint`: the matched hint's id and its
/// patches, already materialized against the triggering state change.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedHint {
    pub hint_id: String,
    pub patches: Vec<Patch>,
    pub confidence: f64,
}

/// Keyed by `componentId:hintId` (`Hint::key`). Insertion order is
/// preserved by `IndexMap`, which is what makes `match_hint`'s scan order
/// deterministic for a given insertion sequence (§4.6).
#[derive(Debug, Default)]
pub struct HintQueue {
    options: HintQueueOptions,
    hints: IndexMap<String, Hint>,
}

impl HintQueue {
    pub fn new(options: HintQueueOptions) -> Self {
        HintQueue {
            options,
            hints: IndexMap::new(),
        }
    }

    /// Insert (or replace) a hint, stamping `queuedAt` and deriving
    /// `isTemplate` from its patches, then evict anything past TTL.
    pub fn queue_hint(&mut self, mut hint: Hint, now_ms: f64) {
        hint.queued_at = now_ms;
        hint.is_template = hint.patches.iter().any(Patch::is_template);
        let key = hint.key();
        tracing::debug!(component_id = hint.component_id, hint_id = hint.hint_id, "queued hint");
        self.hints.insert(key, hint);
        self.evict_expired(now_ms);
    }

    fn evict_expired(&mut self, now_ms: f64) {
        let ttl = self.options.ttl_ms;
        self.hints.retain(|_, hint| {
            let age = now_ms - hint.queued_at;
            let alive = age <= ttl;
            if !alive {
                tracing::debug!(component_id = hint.component_id, hint_id = hint.hint_id, age, "evicting expired hint");
            }
            alive
        });
    }

    /// Find the first non-expired hint for `component_id` whose
    /// `predictedState` is satisfied by `state_changes`, consume it, and
    /// return its materialized patches. A hint is a match when, for every
    /// `(k, v)` in `predictedState`, `state_changes` contains `k` with a
    /// JSON-normalized-equal value; extra keys in `state_changes` are
    /// allowed. Hints are consumed on match and never matched twice.
    pub fn match_hint(
        &mut self,
        component_id: &str,
        state_changes: &StateMap,
        now_ms: f64,
    ) -> Option<MatchedHint> {
        self.evict_expired(now_ms);

        let prefix = format!("{component_id}:");
        let matched_key = self
            .hints
            .iter()
            .find(|(key, hint)| key.starts_with(&prefix) && predicted_state_matches(&hint.predicted_state, state_changes))
            .map(|(key, _)| key.clone())?;

        let hint = self.hints.shift_remove(&matched_key)?;
        tracing::debug!(component_id, hint_id = hint.hint_id, "hint matched and consumed");
        Some(MatchedHint {
            hint_id: hint.hint_id.clone(),
            patches: minimact_template::materialize_patches(&hint.patches, state_changes),
            confidence: hint.confidence,
        })
    }

    pub fn clear_component(&mut self, component_id: &str) {
        let prefix = format!("{component_id}:");
        self.hints.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn clear_all(&mut self) {
        self.hints.clear();
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

fn predicted_state_matches(predicted: &StateMap, actual: &StateMap) -> bool {
    predicted.iter().all(|(key, expected)| {
        actual
            .get(key)
            .is_some_and(|actual_value| json_structurally_equal(expected, actual_value))
    })
}

/// `JSON.stringify`-normalized deep equality: object key order and map
/// representation don't matter, only the value tree does.
fn json_structurally_equal(a: &Value, b: &Value) -> bool {
    a == b
}
