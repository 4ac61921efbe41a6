//! Frame codec and validation
//!
//! A frame is JSON text of the shape `{"Objects": [header, ...messages]}`.
//! Decoding is all-or-nothing: the whole frame is validated against the
//! schema before any part of it is returned.

use serde::{Deserialize, Serialize};

use crate::defs;
use crate::messages::{header_message, ApiArgument, ApiMessage, HeaderInfo};
use crate::types::{ApiValue, ArgumentType, EventType};

/// Codec error, carrying the offending field and the expectation
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to parse frame: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Frame Objects property is an empty array")]
    EmptyFrame,

    #[error("Invalid {field}: expected {expected}, got {got}")]
    Validation {
        field: String,
        expected: String,
        got: String,
    },
}

impl CodecError {
    fn validation(
        field: impl Into<String>,
        expected: impl Into<String>,
        got: impl ToString,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            expected: expected.into(),
            got: got.to_string(),
        }
    }
}

/// A validated, decoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The event header from the first message
    pub header: HeaderInfo,
    /// The remaining messages, in receipt order
    pub messages: Vec<ApiMessage>,
}

// Raw mirror of the wire shape; argument values stay untyped until
// checked against their declared type.

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Objects")]
    objects: Vec<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "Type")]
    ty: String,
    #[serde(rename = "mID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Arguments")]
    arguments: Vec<RawArgument>,
}

#[derive(Deserialize)]
struct RawArgument {
    #[serde(rename = "Type")]
    ty: String,
    #[serde(rename = "mID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: serde_json::Value,
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "Objects")]
    objects: Vec<&'a ApiMessage>,
}

/// Decode and validate a raw frame
///
/// The first message must be a well-formed event header; every further
/// message must be structurally valid with each argument's value matching
/// its declared type. No partial frame is ever returned.
pub fn decode_frame(raw: &str) -> Result<Frame, CodecError> {
    let envelope: RawEnvelope = serde_json::from_str(raw)?;

    let mut objects = envelope.objects.into_iter();
    let header_raw = objects.next().ok_or(CodecError::EmptyFrame)?;
    let header = validate_header(header_raw)?;

    let mut messages = Vec::new();
    for raw_message in objects {
        messages.push(validate_message(raw_message)?);
    }

    Ok(Frame { header, messages })
}

/// Encode a frame from header info and item messages
///
/// Symmetric inverse of [`decode_frame`] for valid inputs.
pub fn encode_frame(info: &HeaderInfo, messages: &[ApiMessage]) -> Result<String, CodecError> {
    let header = header_message(info);
    let mut objects = Vec::with_capacity(messages.len() + 1);
    objects.push(&header);
    objects.extend(messages.iter());
    Ok(serde_json::to_string(&Envelope { objects })?)
}

fn validate_header(raw: RawMessage) -> Result<HeaderInfo, CodecError> {
    let message = validate_message(raw)?;

    if message.name != defs::EVENT_HEADER_NAME {
        return Err(CodecError::validation(
            "header Name",
            format!("\"{}\"", defs::EVENT_HEADER_NAME),
            format!("\"{}\"", message.name),
        ));
    }

    let portal_id = require_string_arg(&message, defs::PORTAL_ID_ARG)?;
    let event_tag = require_string_arg(&message, defs::EVENT_TYPE_ARG)?;
    let event_type = EventType::from_tag(event_tag).ok_or_else(|| {
        CodecError::validation(
            format!("header argument \"{}\"", defs::EVENT_TYPE_ARG),
            "a known portal event type",
            format!("\"{}\"", event_tag),
        )
    })?;

    Ok(HeaderInfo {
        event_id: message.id.clone(),
        portal_id: portal_id.to_string(),
        event_type,
    })
}

fn require_string_arg<'a>(message: &'a ApiMessage, name: &str) -> Result<&'a str, CodecError> {
    let argument = message.argument(name).ok_or_else(|| {
        CodecError::validation(
            format!("header argument \"{}\"", name),
            "argument to be present",
            "missing",
        )
    })?;
    argument.value.as_str().ok_or_else(|| {
        CodecError::validation(
            format!("header argument \"{}\"", name),
            "a string value",
            format!("{:?}", argument.ty),
        )
    })
}

fn validate_message(raw: RawMessage) -> Result<ApiMessage, CodecError> {
    if raw.ty != defs::API_MESSAGE_TYPE {
        return Err(CodecError::validation(
            "message Type",
            format!("\"{}\"", defs::API_MESSAGE_TYPE),
            format!("\"{}\"", raw.ty),
        ));
    }
    if raw.id.is_empty() {
        return Err(CodecError::validation(
            "message mID",
            "a non-empty string",
            "an empty string",
        ));
    }
    if raw.name.is_empty() {
        return Err(CodecError::validation(
            "message Name",
            "a non-empty string",
            "an empty string",
        ));
    }

    let mut arguments = Vec::with_capacity(raw.arguments.len());
    for raw_argument in raw.arguments {
        arguments.push(validate_argument(raw_argument)?);
    }

    Ok(ApiMessage::new(raw.id, raw.name, arguments))
}

fn validate_argument(raw: RawArgument) -> Result<ApiArgument, CodecError> {
    let ty = ArgumentType::from_tag(&raw.ty).ok_or_else(|| {
        CodecError::validation(
            format!("argument \"{}\" Type", raw.name),
            "a known argument type",
            format!("\"{}\"", raw.ty),
        )
    })?;

    let value = convert_value(ty, &raw.value).ok_or_else(|| {
        CodecError::validation(
            format!("argument \"{}\" Value", raw.name),
            format!("a value of type {}", ty.tag()),
            &raw.value,
        )
    })?;

    Ok(ApiArgument {
        ty,
        id: raw.id,
        name: raw.name,
        value,
    })
}

/// Convert a raw JSON value to the declared argument type, or fail on a
/// shape mismatch
fn convert_value(ty: ArgumentType, value: &serde_json::Value) -> Option<ApiValue> {
    match ty {
        ArgumentType::String => value.as_str().map(|s| ApiValue::String(s.to_string())),
        ArgumentType::Bool => value.as_bool().map(ApiValue::Bool),
        ArgumentType::Byte => value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .map(ApiValue::Byte),
        ArgumentType::Int => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(ApiValue::Int),
        ArgumentType::Long => value.as_i64().map(ApiValue::Long),
        ArgumentType::Float => value.as_f64().map(|v| ApiValue::Float(v as f32)),
        ArgumentType::Double => value.as_f64().map(ApiValue::Double),
        ArgumentType::StringArray => convert_array(value, |v| {
            v.as_str().map(|s| s.to_string())
        })
        .map(ApiValue::StringArray),
        ArgumentType::BoolArray => {
            convert_array(value, serde_json::Value::as_bool).map(ApiValue::BoolArray)
        }
        ArgumentType::ByteArray => {
            convert_array(value, |v| v.as_u64().and_then(|x| u8::try_from(x).ok()))
                .map(ApiValue::ByteArray)
        }
        ArgumentType::IntArray => {
            convert_array(value, |v| v.as_i64().and_then(|x| i32::try_from(x).ok()))
                .map(ApiValue::IntArray)
        }
        ArgumentType::LongArray => {
            convert_array(value, serde_json::Value::as_i64).map(ApiValue::LongArray)
        }
        ArgumentType::FloatArray => {
            convert_array(value, |v| v.as_f64().map(|x| x as f32)).map(ApiValue::FloatArray)
        }
        ArgumentType::DoubleArray => {
            convert_array(value, serde_json::Value::as_f64).map(ApiValue::DoubleArray)
        }
    }
}

fn convert_array<T>(
    value: &serde_json::Value,
    convert: impl Fn(&serde_json::Value) -> Option<T>,
) -> Option<Vec<T>> {
    value.as_array()?.iter().map(convert).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{item_update_message, ItemUpdateInfo};

    fn request_header() -> HeaderInfo {
        HeaderInfo {
            event_id: "S1".into(),
            portal_id: "P1".into(),
            event_type: EventType::Request,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        for event_type in EventType::ALL {
            let info = HeaderInfo {
                event_id: "e-123".into(),
                portal_id: "portal-a".into(),
                event_type,
            };
            let raw = encode_frame(&info, &[]).unwrap();
            let frame = decode_frame(&raw).unwrap();
            assert_eq!(frame.header, info);
            assert!(frame.messages.is_empty());
        }
    }

    #[test]
    fn test_roundtrip_with_item_update() {
        let update = item_update_message(&ItemUpdateInfo {
            id: "item1".into(),
            name: "Brightness".into(),
            ty: ArgumentType::Float,
            value: ApiValue::Float(0.5),
        });
        let raw = encode_frame(&request_header(), &[update.clone()]).unwrap();
        let frame = decode_frame(&raw).unwrap();
        assert_eq!(frame.messages, vec![update]);
    }

    #[test]
    fn test_decode_request_scenario() {
        // Shape from the protocol documentation
        let raw = r#"{"Objects":[{
            "Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
            "Arguments":[
                {"Type":"nap::APIString","mID":"a1","Name":"portal_id","Value":"P1"},
                {"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Request"}
            ]}]}"#;
        let frame = decode_frame(raw).unwrap();
        assert_eq!(frame.header.event_id, "S1");
        assert_eq!(frame.header.portal_id, "P1");
        assert_eq!(frame.header.event_type, EventType::Request);
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(matches!(
            decode_frame("not json"),
            Err(CodecError::Parse(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_objects() {
        assert!(matches!(
            decode_frame(r#"{"Objects":[]}"#),
            Err(CodecError::EmptyFrame)
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_message_type() {
        let raw = r#"{"Objects":[{"Type":"nap::Other","mID":"S1","Name":"portal_event_header","Arguments":[]}]}"#;
        match decode_frame(raw) {
            Err(CodecError::Validation { field, .. }) => assert_eq!(field, "message Type"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_header_name() {
        let raw = r#"{"Objects":[{"Type":"nap::APIMessage","mID":"S1","Name":"something","Arguments":[]}]}"#;
        match decode_frame(raw) {
            Err(CodecError::Validation { field, .. }) => assert_eq!(field, "header Name"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_missing_portal_id() {
        let raw = r#"{"Objects":[{"Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
            "Arguments":[{"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Request"}]}]}"#;
        match decode_frame(raw) {
            Err(CodecError::Validation { field, .. }) => {
                assert_eq!(field, "header argument \"portal_id\"")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_event_type() {
        let raw = r#"{"Objects":[{"Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
            "Arguments":[
                {"Type":"nap::APIString","mID":"a1","Name":"portal_id","Value":"P1"},
                {"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Bogus"}
            ]}]}"#;
        match decode_frame(raw) {
            Err(CodecError::Validation { field, .. }) => {
                assert_eq!(field, "header argument \"portal_event_type\"")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_scalar_type_mismatch() {
        // Declared string, carries a number
        let raw = r#"{"Objects":[
            {"Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
             "Arguments":[
                {"Type":"nap::APIString","mID":"a1","Name":"portal_id","Value":"P1"},
                {"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Response"}]},
            {"Type":"nap::APIMessage","mID":"item1","Name":"Brightness",
             "Arguments":[{"Type":"nap::APIString","mID":"a3","Name":"portal_item_value","Value":42}]}
        ]}"#;
        match decode_frame(raw) {
            Err(CodecError::Validation { field, .. }) => {
                assert_eq!(field, "argument \"portal_item_value\" Value")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_array_element_mismatch() {
        // Declared bool array, carries mixed elements
        let raw = r#"{"Objects":[
            {"Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
             "Arguments":[
                {"Type":"nap::APIString","mID":"a1","Name":"portal_id","Value":"P1"},
                {"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Response"}]},
            {"Type":"nap::APIMessage","mID":"item1","Name":"Flags",
             "Arguments":[{"Type":"nap::APIBoolArray","mID":"a3","Name":"portal_item_value","Value":[true,1]}]}
        ]}"#;
        assert!(matches!(
            decode_frame(raw),
            Err(CodecError::Validation { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_message_id() {
        let raw = r#"{"Objects":[
            {"Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
             "Arguments":[
                {"Type":"nap::APIString","mID":"a1","Name":"portal_id","Value":"P1"},
                {"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Response"}]},
            {"Type":"nap::APIMessage","mID":"","Name":"Brightness","Arguments":[]}
        ]}"#;
        match decode_frame(raw) {
            Err(CodecError::Validation { field, .. }) => assert_eq!(field, "message mID"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_preserves_message_order() {
        let messages: Vec<ApiMessage> = (0..5)
            .map(|i| {
                item_update_message(&ItemUpdateInfo {
                    id: format!("item{}", i),
                    name: format!("Item {}", i),
                    ty: ArgumentType::Int,
                    value: ApiValue::Int(i),
                })
            })
            .collect();
        let raw = encode_frame(&request_header(), &messages).unwrap();
        let frame = decode_frame(&raw).unwrap();
        let ids: Vec<&str> = frame.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["item0", "item1", "item2", "item3", "item4"]);
    }

    #[test]
    fn test_byte_range_enforced() {
        let raw = r#"{"Objects":[
            {"Type":"nap::APIMessage","mID":"S1","Name":"portal_event_header",
             "Arguments":[
                {"Type":"nap::APIString","mID":"a1","Name":"portal_id","Value":"P1"},
                {"Type":"nap::APIString","mID":"a2","Name":"portal_event_type","Value":"EPortalEventType::Response"}]},
            {"Type":"nap::APIMessage","mID":"item1","Name":"Level",
             "Arguments":[{"Type":"nap::APIByte","mID":"a3","Name":"portal_item_value","Value":300}]}
        ]}"#;
        assert!(matches!(
            decode_frame(raw),
            Err(CodecError::Validation { .. })
        ));
    }
}
