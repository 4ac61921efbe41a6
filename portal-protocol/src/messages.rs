//! Message and header types
//!
//! An [`ApiMessage`] is the named, typed record exchanged with the host;
//! the first message of every frame is the event header, described here by
//! [`HeaderInfo`].

use serde::ser::SerializeStruct;
use serde::Serialize;
use uuid::Uuid;

use crate::defs;
use crate::types::{ApiValue, ArgumentType, EventType};

/// A single typed, named argument of a message
#[derive(Debug, Clone, PartialEq)]
pub struct ApiArgument {
    /// Declared value type, must match the runtime shape of `value`
    pub ty: ArgumentType,
    /// Unique-enough identifier
    pub id: String,
    /// Argument name, used for lookup
    pub name: String,
    /// Runtime value
    pub value: ApiValue,
}

impl ApiArgument {
    /// Create an argument with a fresh identifier; the declared type is
    /// derived from the value
    pub fn new(name: impl Into<String>, value: ApiValue) -> Self {
        Self {
            ty: value.argument_type(),
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            value,
        }
    }
}

impl Serialize for ApiArgument {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ApiArgument", 4)?;
        s.serialize_field("Type", self.ty.tag())?;
        s.serialize_field("mID", &self.id)?;
        s.serialize_field("Name", &self.name)?;
        s.serialize_field("Value", &self.value)?;
        s.end()
    }
}

/// A wire message: named record carrying an ordered argument list
///
/// The `Type` discriminator is fixed to [`defs::API_MESSAGE_TYPE`] and
/// written by the `Serialize` impl.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiMessage {
    /// Message identifier (item id, or correlation id for headers)
    pub id: String,
    /// Display name
    pub name: String,
    /// Ordered argument list
    pub arguments: Vec<ApiArgument>,
}

impl ApiMessage {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: Vec<ApiArgument>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Look up an argument by name
    pub fn argument(&self, name: &str) -> Option<&ApiArgument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// String value of the named argument, if present and a string
    pub fn string_arg(&self, name: &str) -> Option<&str> {
        self.argument(name).and_then(|a| a.value.as_str())
    }

    /// Boolean value of the named argument, if present and a bool
    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        self.argument(name).and_then(|a| a.value.as_bool())
    }

    /// Numeric value of the named argument widened to f64
    pub fn numeric_arg(&self, name: &str) -> Option<f64> {
        self.argument(name).and_then(|a| a.value.as_f64())
    }

    /// Numeric array value of the named argument widened to f64
    pub fn numeric_array_arg(&self, name: &str) -> Option<Vec<f64>> {
        self.argument(name).and_then(|a| a.value.as_f64_array())
    }

    /// String array value of the named argument
    pub fn string_array_arg(&self, name: &str) -> Option<&[String]> {
        self.argument(name).and_then(|a| a.value.as_string_array())
    }
}

impl Serialize for ApiMessage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ApiMessage", 4)?;
        s.serialize_field("Type", defs::API_MESSAGE_TYPE)?;
        s.serialize_field("mID", &self.id)?;
        s.serialize_field("Name", &self.name)?;
        s.serialize_field("Arguments", &self.arguments)?;
        s.end()
    }
}

/// Decoded event header: correlation id, target portal, event kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Correlation identifier; matches the issuing session's id, or a
    /// host-generated id for unsolicited pushes
    pub event_id: String,
    /// Target portal component identifier
    pub portal_id: String,
    /// Event kind discriminator
    pub event_type: EventType,
}

/// A local item edit, packaged for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdateInfo {
    /// Item identifier
    pub id: String,
    /// Item display name
    pub name: String,
    /// Declared type of the item value
    pub ty: ArgumentType,
    /// The new value
    pub value: ApiValue,
}

/// Build the event header message for the given info
///
/// Pure inverse of the header decoding performed by
/// [`crate::codec::decode_frame`].
pub fn header_message(info: &HeaderInfo) -> ApiMessage {
    ApiMessage::new(
        info.event_id.clone(),
        defs::EVENT_HEADER_NAME,
        vec![
            ApiArgument::new(defs::PORTAL_ID_ARG, ApiValue::String(info.portal_id.clone())),
            ApiArgument::new(
                defs::EVENT_TYPE_ARG,
                ApiValue::String(info.event_type.tag().to_string()),
            ),
        ],
    )
}

/// Build the item update message for a local edit
pub fn item_update_message(info: &ItemUpdateInfo) -> ApiMessage {
    let mut argument = ApiArgument::new(defs::ITEM_VALUE_ARG, info.value.clone());
    argument.ty = info.ty;
    ApiMessage::new(info.id.clone(), info.name.clone(), vec![argument])
}
