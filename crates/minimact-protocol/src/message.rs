//! The SignalR-JSON-compatible wire envelope (§4.1).
//!
//! Every message is a UTF-8 JSON object terminated by the record-separator
//! byte `0x1E`; a frame may concatenate several. `RawMessage` is the
//! one-shape-fits-all wire struct (SignalR itself does this — different
//! `type` values populate different subsets of the same field list);
//! [`Message`] is the typed form the rest of the crate works with.

use serde_json::Value;

/// The byte (and, equivalently, the single-codepoint `char`) that
/// terminates every protocol message.
pub const RECORD_SEPARATOR: u8 = 0x1E;
const RECORD_SEPARATOR_CHAR: char = '\u{1E}';

pub const TYPE_INVOCATION: u8 = 1;
pub const TYPE_COMPLETION: u8 = 3;
pub const TYPE_PING: u8 = 6;
pub const TYPE_CLOSE: u8 = 7;

/// The first message sent by the client once the socket opens.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HandshakeRequest {
    pub protocol: &'static str,
    pub version: u32,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        HandshakeRequest {
            protocol: "json",
            version: 1,
        }
    }
}

/// The server's reply to the handshake. Presence of `error` fails the
/// connection attempt.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct HandshakeResponse {
    #[serde(default)]
    pub error: Option<String>,
}

/// The wire shape shared by every message type; which fields are populated
/// depends on `kind`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, rename = "invocationId", skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, rename = "allowReconnect", skip_serializing_if = "Option::is_none")]
    pub allow_reconnect: Option<bool>,
}

/// A typed, validated message. Constructed from a [`RawMessage`] via
/// [`Message::from_raw`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A server→client or client→server method call. `invocation_id` is
    /// `None` for fire-and-forget calls.
    Invocation {
        invocation_id: Option<String>,
        target: String,
        arguments: Vec<Value>,
    },
    /// The result of a previously-sent `Invocation` that carried an id.
    Completion {
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },
    /// Keep-alive; reflected back with another `Ping`.
    Ping,
    /// The server is closing the connection.
    Close {
        error: Option<String>,
        allow_reconnect: Option<bool>,
    },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("invocation message missing 'target'")]
    MissingTarget,
    #[error("completion message missing 'invocationId'")]
    MissingInvocationId,
}

impl Message {
    pub fn from_raw(raw: RawMessage) -> Result<Message, MessageError> {
        match raw.kind {
            TYPE_INVOCATION => Ok(Message::Invocation {
                invocation_id: raw.invocation_id,
                target: raw.target.ok_or(MessageError::MissingTarget)?,
                arguments: raw.arguments.unwrap_or_default(),
            }),
            TYPE_COMPLETION => Ok(Message::Completion {
                invocation_id: raw.invocation_id.ok_or(MessageError::MissingInvocationId)?,
                result: raw.result,
                error: raw.error,
            }),
            TYPE_PING => Ok(Message::Ping),
            TYPE_CLOSE => Ok(Message::Close {
                error: raw.error,
                allow_reconnect: raw.allow_reconnect,
            }),
            other => Err(MessageError::UnknownType(other)),
        }
    }

    pub fn into_raw(self) -> RawMessage {
        match self {
            Message::Invocation {
                invocation_id,
                target,
                arguments,
            } => RawMessage {
                kind: TYPE_INVOCATION,
                invocation_id,
                target: Some(target),
                arguments: Some(arguments),
                result: None,
                error: None,
                allow_reconnect: None,
            },
            Message::Completion {
                invocation_id,
                result,
                error,
            } => RawMessage {
                kind: TYPE_COMPLETION,
                invocation_id: Some(invocation_id),
                target: None,
                arguments: None,
                result,
                error,
                allow_reconnect: None,
            },
            Message::Ping => RawMessage {
                kind: TYPE_PING,
                invocation_id: None,
                target: None,
                arguments: None,
                result: None,
                error: None,
                allow_reconnect: None,
            },
            Message::Close {
                error,
                allow_reconnect,
            } => RawMessage {
                kind: TYPE_CLOSE,
                invocation_id: None,
                target: None,
                arguments: None,
                result: None,
                error,
                allow_reconnect,
            },
        }
    }

    /// Serialize this message, appending the terminating record separator.
    pub fn encode(&self) -> String {
        encode_message(self)
    }
}

pub fn encode_message(message: &Message) -> String {
    let mut out = serde_json::to_string(&message.clone().into_raw())
        .expect("RawMessage serialization is infallible");
    out.push(RECORD_SEPARATOR_CHAR);
    out
}

/// Split a frame (which may carry several record-separator-terminated JSON
/// objects) into its individual message texts, in order, trailing empty
/// segments discarded.
pub fn split_frame(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR_CHAR)
        .filter(|segment| !segment.is_empty())
}

/// Parse every message in a frame, in order. A segment that fails to parse
/// as JSON or as a known message type is reported inline so the caller can
/// decide whether to log-and-skip it or abort (the base spec requires the
/// former for everything except the handshake).
pub fn parse_frame(frame: &str) -> Vec<Result<Message, FrameParseError>> {
    split_frame(frame)
        .map(|segment| {
            let raw: RawMessage =
                serde_json::from_str(segment).map_err(FrameParseError::Json)?;
            Message::from_raw(raw).map_err(FrameParseError::Message)
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FrameParseError {
    #[error("invalid JSON in frame segment: {0}")]
    Json(serde_json::Error),
    #[error(transparent)]
    Message(#[from] MessageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_messages_in_one_frame() {
        let frame = "{\"type\":6}\u{1E}{\"type\":1,\"target\":\"ApplyPatches\",\"arguments\":[\"c1\",[]]}\u{1E}";
        let parsed = parse_frame(frame);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].as_ref().unwrap(), &Message::Ping);
        assert!(matches!(
            parsed[1].as_ref().unwrap(),
            Message::Invocation { target, .. } if target == "ApplyPatches"
        ));
    }

    #[test]
    fn encode_then_split_round_trips() {
        let msg = Message::Invocation {
            invocation_id: Some("1".into()),
            target: "RegisterComponent".into(),
            arguments: vec![Value::String("c1".into())],
        };
        let encoded = msg.encode();
        assert!(encoded.ends_with(RECORD_SEPARATOR_CHAR));
        let parsed = parse_frame(&encoded);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].as_ref().unwrap(), &msg);
    }

    #[test]
    fn fire_and_forget_invocation_has_no_id() {
        let raw: RawMessage =
            serde_json::from_str("{\"type\":1,\"target\":\"Inc\",\"arguments\":[]}").unwrap();
        let msg = Message::from_raw(raw).unwrap();
        assert!(matches!(msg, Message::Invocation { invocation_id: None, .. }));
    }

    #[test]
    fn unknown_type_is_an_error_not_a_panic() {
        let raw = RawMessage {
            kind: 99,
            invocation_id: None,
            target: None,
            arguments: None,
            result: None,
            error: None,
            allow_reconnect: None,
        };
        assert_eq!(Message::from_raw(raw), Err(MessageError::UnknownType(99)));
    }

    #[test]
    fn empty_frame_splits_to_nothing() {
        assert_eq!(split_frame("").count(), 0);
    }
}
