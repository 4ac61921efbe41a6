//! Typed argument and event enumerations
//!
//! The wire format tags every argument with a type discriminator and
//! carries the value as plain JSON. [`ArgumentType`] is the closed set of
//! discriminators, [`ApiValue`] the matching sum type over runtime values.

use serde::Serialize;

/// Argument type discriminator, one variant per wire tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    String,
    Bool,
    Byte,
    Int,
    Long,
    Float,
    Double,
    StringArray,
    BoolArray,
    ByteArray,
    IntArray,
    LongArray,
    FloatArray,
    DoubleArray,
}

impl ArgumentType {
    /// All known wire tags, in declaration order
    pub const ALL: [ArgumentType; 14] = [
        Self::String,
        Self::Bool,
        Self::Byte,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::StringArray,
        Self::BoolArray,
        Self::ByteArray,
        Self::IntArray,
        Self::LongArray,
        Self::FloatArray,
        Self::DoubleArray,
    ];

    /// The wire tag for this type
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "nap::APIString",
            Self::Bool => "nap::APIBool",
            Self::Byte => "nap::APIByte",
            Self::Int => "nap::APIInt",
            Self::Long => "nap::APILong",
            Self::Float => "nap::APIFloat",
            Self::Double => "nap::APIDouble",
            Self::StringArray => "nap::APIStringArray",
            Self::BoolArray => "nap::APIBoolArray",
            Self::ByteArray => "nap::APIByteArray",
            Self::IntArray => "nap::APIIntArray",
            Self::LongArray => "nap::APILongArray",
            Self::FloatArray => "nap::APIFloatArray",
            Self::DoubleArray => "nap::APIDoubleArray",
        }
    }

    /// Parse a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Whether values of this type are numbers (or arrays of numbers)
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.scalar(),
            Self::Byte | Self::Int | Self::Long | Self::Float | Self::Double
        )
    }

    /// Whether values of this type carry no fractional part
    pub fn is_integral(&self) -> bool {
        matches!(self.scalar(), Self::Byte | Self::Int | Self::Long)
    }

    /// Whether this is an array type
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::StringArray
                | Self::BoolArray
                | Self::ByteArray
                | Self::IntArray
                | Self::LongArray
                | Self::FloatArray
                | Self::DoubleArray
        )
    }

    /// The scalar type this type is built from (identity for scalars)
    pub fn scalar(&self) -> Self {
        match self {
            Self::StringArray => Self::String,
            Self::BoolArray => Self::Bool,
            Self::ByteArray => Self::Byte,
            Self::IntArray => Self::Int,
            Self::LongArray => Self::Long,
            Self::FloatArray => Self::Float,
            Self::DoubleArray => Self::Double,
            other => *other,
        }
    }
}

impl Serialize for ArgumentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

/// A runtime argument value, matching its declared [`ArgumentType`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiValue {
    String(String),
    Bool(bool),
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    StringArray(Vec<String>),
    BoolArray(Vec<bool>),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
}

impl ApiValue {
    /// The declared type this value satisfies
    pub fn argument_type(&self) -> ArgumentType {
        match self {
            Self::String(_) => ArgumentType::String,
            Self::Bool(_) => ArgumentType::Bool,
            Self::Byte(_) => ArgumentType::Byte,
            Self::Int(_) => ArgumentType::Int,
            Self::Long(_) => ArgumentType::Long,
            Self::Float(_) => ArgumentType::Float,
            Self::Double(_) => ArgumentType::Double,
            Self::StringArray(_) => ArgumentType::StringArray,
            Self::BoolArray(_) => ArgumentType::BoolArray,
            Self::ByteArray(_) => ArgumentType::ByteArray,
            Self::IntArray(_) => ArgumentType::IntArray,
            Self::LongArray(_) => ArgumentType::LongArray,
            Self::FloatArray(_) => ArgumentType::FloatArray,
            Self::DoubleArray(_) => ArgumentType::DoubleArray,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any scalar numeric value, widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric array value, widened to f64
    pub fn as_f64_array(&self) -> Option<Vec<f64>> {
        match self {
            Self::ByteArray(v) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            Self::IntArray(v) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            Self::LongArray(v) => Some(v.iter().map(|x| *x as f64).collect()),
            Self::FloatArray(v) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            Self::DoubleArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            Self::StringArray(v) => Some(v),
            _ => None,
        }
    }
}

/// Portal event kind, carried in the header's `portal_event_type` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Request,
    Response,
    ValueUpdate,
    StateUpdate,
    Reload,
    OpenDialog,
    DialogClosed,
    Invalid,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        Self::Request,
        Self::Response,
        Self::ValueUpdate,
        Self::StateUpdate,
        Self::Reload,
        Self::OpenDialog,
        Self::DialogClosed,
        Self::Invalid,
    ];

    /// The wire tag for this event kind
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Request => "EPortalEventType::Request",
            Self::Response => "EPortalEventType::Response",
            Self::ValueUpdate => "EPortalEventType::ValueUpdate",
            Self::StateUpdate => "EPortalEventType::StateUpdate",
            Self::Reload => "EPortalEventType::Reload",
            Self::OpenDialog => "EPortalEventType::OpenDialog",
            Self::DialogClosed => "EPortalEventType::DialogClosed",
            Self::Invalid => "EPortalEventType::Invalid",
        }
    }

    /// Parse a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_type_tag_roundtrip() {
        for ty in ArgumentType::ALL {
            assert_eq!(ArgumentType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(ArgumentType::from_tag("nap::APIChar"), None);
    }

    #[test]
    fn test_event_type_tag_roundtrip() {
        for ty in EventType::ALL {
            assert_eq!(EventType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(EventType::from_tag("EPortalEventType::Update"), None);
    }

    #[test]
    fn test_numeric_and_integral() {
        assert!(ArgumentType::Float.is_numeric());
        assert!(ArgumentType::IntArray.is_numeric());
        assert!(!ArgumentType::String.is_numeric());
        assert!(ArgumentType::Byte.is_integral());
        assert!(ArgumentType::LongArray.is_integral());
        assert!(!ArgumentType::Double.is_integral());
    }

    #[test]
    fn test_array_scalar() {
        assert!(ArgumentType::FloatArray.is_array());
        assert!(!ArgumentType::Float.is_array());
        assert_eq!(ArgumentType::FloatArray.scalar(), ArgumentType::Float);
        assert_eq!(ArgumentType::Bool.scalar(), ArgumentType::Bool);
    }

    #[test]
    fn test_value_matches_declared_type() {
        assert_eq!(
            ApiValue::Float(0.5).argument_type(),
            ArgumentType::Float
        );
        assert_eq!(
            ApiValue::StringArray(vec!["a".into()]).argument_type(),
            ArgumentType::StringArray
        );
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(ApiValue::Byte(7).as_f64(), Some(7.0));
        assert_eq!(ApiValue::Long(-3).as_f64(), Some(-3.0));
        assert_eq!(ApiValue::String("x".into()).as_f64(), None);
        assert_eq!(
            ApiValue::IntArray(vec![1, 2]).as_f64_array(),
            Some(vec![1.0, 2.0])
        );
    }

    #[test]
    fn test_value_serializes_as_plain_json() {
        let json = serde_json::to_string(&ApiValue::FloatArray(vec![0.5, 1.0])).unwrap();
        assert_eq!(json, "[0.5,1.0]");
        let json = serde_json::to_string(&ApiValue::Bool(true)).unwrap();
        assert_eq!(json, "true");
    }
}
