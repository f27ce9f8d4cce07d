use std::time::Duration;

use serde::Deserialize;

use super::duration::deserialize_threshold;
use super::errors::ProtocolError;

/// Server -> board event envelopes.
///
/// Each variant maps to a JSON object with `"type"` as the tag field. Kinds
/// this client does not know decode to [`Envelope::Unknown`] so that newer
/// servers can add event kinds without breaking older boards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Transport heartbeat. Carries no fields.
    #[serde(rename = "keepalive")]
    Keepalive,

    /// Insert a new box after an existing box or anchor.
    #[serde(rename = "createBox")]
    CreateBox {
        #[serde(rename = "afterId", alias = "after")]
        after_id: String,
        #[serde(rename = "box")]
        payload: BoxPayload,
    },

    /// Apply the fields present to an existing box.
    #[serde(rename = "updateBox")]
    UpdateBox(BoxPatch),

    #[serde(rename = "deleteBox")]
    DeleteBox { id: String },

    /// Server asks the board to drop its state and reload.
    #[serde(rename = "reloadPage")]
    ReloadPage,

    #[serde(other)]
    Unknown,
}

/// Full box description carried by `createBox` and snapshots.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxPayload {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "displayname")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    /// RFC 3339 timestamp of the last update seen by the server.
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default, rename = "maxTBU", deserialize_with = "deserialize_threshold")]
    pub max_tbu: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_threshold")]
    pub expire_after: Option<Duration>,
    /// Layout tag (`dot`, `small`, `xlarge`, ...). Opaque to the engine.
    #[serde(default)]
    pub size: Option<String>,
}

/// Partial update carried by `updateBox`.
///
/// `None` means "field absent, leave unchanged". A threshold of
/// `Some(Duration::ZERO)` disables that timer.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BoxPatch {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "lastMessage", alias = "message")]
    pub message: Option<String>,
    #[serde(default, rename = "maxTBU", deserialize_with = "deserialize_threshold")]
    pub max_tbu: Option<Duration>,
    #[serde(
        default,
        rename = "expireAfter",
        deserialize_with = "deserialize_threshold"
    )]
    pub expire_after: Option<Duration>,
}

impl BoxPatch {
    /// Status, ignoring empty strings.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Message, ignoring empty strings.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

impl Envelope {
    /// Wire name of the envelope kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Keepalive => "keepalive",
            Envelope::CreateBox { .. } => "createBox",
            Envelope::UpdateBox(_) => "updateBox",
            Envelope::DeleteBox { .. } => "deleteBox",
            Envelope::ReloadPage => "reloadPage",
            Envelope::Unknown => "unknown",
        }
    }

    /// Box the envelope refers to, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Envelope::CreateBox { payload, .. } => Some(&payload.id),
            Envelope::UpdateBox(patch) => Some(&patch.id),
            Envelope::DeleteBox { id } => Some(id),
            Envelope::Keepalive | Envelope::ReloadPage | Envelope::Unknown => None,
        }
    }
}

/// Decode one envelope payload.
pub fn decode_envelope(raw: &str) -> Result<Envelope, ProtocolError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keepalive_with_extra_fields() {
        // The server serializes its full event struct, so keepalives carry
        // empty threshold fields.
        let envelope =
            decode_envelope(r#"{"type":"keepalive","expireAfter":"","maxTBU":""}"#).unwrap();
        assert_eq!(envelope, Envelope::Keepalive);
    }

    #[test]
    fn test_decode_create_box_accepts_after_alias() {
        let raw = r#"{"type":"createBox","after":"status-bar","box":{"id":"b1","name":"web","status":"green","maxTBU":"5m","size":"small"}}"#;
        let Envelope::CreateBox { after_id, payload } = decode_envelope(raw).unwrap() else {
            panic!("expected createBox");
        };
        assert_eq!(after_id, "status-bar");
        assert_eq!(payload.id, "b1");
        assert_eq!(payload.max_tbu, Some(Duration::from_secs(300)));
        assert_eq!(payload.expire_after, None);
        assert_eq!(payload.size.as_deref(), Some("small"));
    }

    #[test]
    fn test_decode_update_box_partial_fields() {
        let raw = r#"{"type":"updateBox","id":"b1","status":"red","maxTBU":"0"}"#;
        let Envelope::UpdateBox(patch) = decode_envelope(raw).unwrap() else {
            panic!("expected updateBox");
        };
        assert_eq!(patch.status(), Some("red"));
        assert_eq!(patch.message(), None);
        assert_eq!(patch.max_tbu, Some(Duration::ZERO));
        assert_eq!(patch.expire_after, None);
    }

    #[test]
    fn test_empty_fields_are_absent() {
        let raw = r#"{"type":"updateBox","id":"b1","status":"","lastMessage":"","expireAfter":""}"#;
        let Envelope::UpdateBox(patch) = decode_envelope(raw).unwrap() else {
            panic!("expected updateBox");
        };
        assert_eq!(patch.status(), None);
        assert_eq!(patch.message(), None);
        assert_eq!(patch.expire_after, None);
    }

    #[test]
    fn test_unknown_kind_is_not_an_error() {
        let envelope = decode_envelope(r#"{"type":"resizeBox","id":"b1","width":3}"#).unwrap();
        assert_eq!(envelope, Envelope::Unknown);
        assert_eq!(envelope.kind(), "unknown");
        assert_eq!(envelope.target_id(), None);
    }

    #[test]
    fn test_malformed_payloads_fail() {
        assert!(decode_envelope("{not json").is_err());
        assert!(decode_envelope(r#"{"id":"b1"}"#).is_err());
        assert!(decode_envelope(r#"{"type":"deleteBox"}"#).is_err());
        assert!(decode_envelope(r#"{"type":"updateBox","id":"b1","maxTBU":"soon"}"#).is_err());
    }

    #[test]
    fn test_target_id() {
        let envelope = decode_envelope(r#"{"type":"deleteBox","id":"b9"}"#).unwrap();
        assert_eq!(envelope.kind(), "deleteBox");
        assert_eq!(envelope.target_id(), Some("b9"));
    }
}
