//! Semantic array-operation descriptors (§4.7, Design Notes "Array operation
//! semantics").
//!
//! A setter on an array-valued state slot sends one of these alongside the
//! raw new array so the server can index precisely into loop templates
//! instead of re-deriving intent from a diff.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ArrayOperation {
    Append { item: Value },
    Prepend { item: Value },
    InsertAt { index: usize, item: Value },
    RemoveAt { index: usize },
    UpdateAt { index: usize, item: Value },
    Clear,
    RemoveWhere,
    UpdateWhere,
    AppendMany { items: Vec<Value> },
    RemoveMany { indices: Vec<usize> },
}
