//! Wire types shared between the transport, template, DOM, and hint-queue
//! crates: the virtual-node model, the patch taxonomy, the hint record, and
//! the SignalR-JSON message envelope (§3, §4.1).

mod array_op;
mod hint;
mod message;
mod patch;
mod vnode;

pub use array_op::ArrayOperation;
pub use hint::Hint;
pub use message::{
    encode_message, parse_frame, split_frame, FrameParseError, HandshakeRequest,
    HandshakeResponse, Message, MessageError, RawMessage, RECORD_SEPARATOR,
};
pub use patch::{Binding, ItemTemplate, LoopTemplate, Patch, Path, TemplatePatch};
pub use vnode::VNode;

/// A component's state slots, or the `predictedState`/`stateChanges` maps
/// compared against them. Keyed by state key (`state_<i>`), not by hook
/// identity — the hook slot index *is* the key (§3 "Invariants").
pub type StateMap = std::collections::BTreeMap<String, serde_json::Value>;
