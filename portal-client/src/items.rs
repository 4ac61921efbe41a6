//! Portal item model
//!
//! A [`PortalItem`] is the client-side mirror of one control exposed by the
//! host: its identity, its closed [`ItemKind`] with the per-kind metadata,
//! the current value and the enabled/visible state. Construction from a
//! wire message is strict; an item that does not carry what its type tag
//! promises is rejected as a whole.

use portal_protocol::defs;
use portal_protocol::{ApiMessage, ApiValue, ArgumentType, ItemUpdateInfo};
use portal_utils::{PortalError, Result};

/// Interaction events a button can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Click,
    Press,
    Release,
}

impl ButtonEvent {
    /// The wire value sent as the button's item value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => defs::BUTTON_EVENT_CLICK,
            Self::Press => defs::BUTTON_EVENT_PRESS,
            Self::Release => defs::BUTTON_EVENT_RELEASE,
        }
    }
}

/// Horizontal placement of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

impl Alignment {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Left" => Some(Self::Left),
            "Right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// The closed set of control kinds, with per-kind metadata
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// Numeric scalar with a range
    Slider { min: f64, max: f64 },
    /// Boolean switch
    Toggle,
    /// Momentary trigger; carries no persistent value
    Button { alignment: Alignment },
    /// Color with 3 (RGB) or 4 (RGBA) channels
    Color { channels: usize },
    /// Index selection over a replaceable option list
    Dropdown { options: Vec<String> },
    /// Single-line text input
    TextField,
    /// Multi-line text input
    TextArea,
    /// Display-only text
    Label,
    /// Visual divider; carries no value
    Separator,
    /// Fixed-length numeric vector with a per-component range
    Vector { min: f64, max: f64, len: usize },
    /// Weekly schedule as a string array
    OperationalCalendar,
}

/// Client-side mirror of one host control
#[derive(Debug, Clone, PartialEq)]
pub struct PortalItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    /// Declared wire type of the item value; updates must match it
    pub value_type: ArgumentType,
    pub value: ApiValue,
    pub enabled: bool,
    pub visible: bool,
}

fn malformed(id: &str, message: impl Into<String>) -> PortalError {
    PortalError::MalformedItem {
        id: id.into(),
        message: message.into(),
    }
}

impl PortalItem {
    /// Construct an item from its descriptor message
    ///
    /// The message name is the display name; the `portal_item_type`
    /// argument selects the kind and dictates which other arguments are
    /// required.
    pub fn from_message(message: &ApiMessage) -> Result<Self> {
        let tag = message
            .string_arg(defs::ITEM_TYPE_ARG)
            .ok_or_else(|| malformed(&message.id, "missing portal_item_type argument"))?;

        let (kind, value_type, value) = match tag {
            defs::ITEM_SLIDER_BYTE => slider(message, ArgumentType::Byte)?,
            defs::ITEM_SLIDER_INT => slider(message, ArgumentType::Int)?,
            defs::ITEM_SLIDER_LONG => slider(message, ArgumentType::Long)?,
            defs::ITEM_SLIDER_FLOAT => slider(message, ArgumentType::Float)?,
            defs::ITEM_SLIDER_DOUBLE => slider(message, ArgumentType::Double)?,
            defs::ITEM_TOGGLE => {
                let value = require_value(message, ArgumentType::Bool)?;
                (ItemKind::Toggle, ArgumentType::Bool, value)
            }
            defs::ITEM_BUTTON => {
                let alignment = message
                    .string_arg(defs::ITEM_ALIGNMENT_ARG)
                    .and_then(Alignment::from_tag)
                    .unwrap_or_default();
                (
                    ItemKind::Button { alignment },
                    ArgumentType::String,
                    ApiValue::String(String::new()),
                )
            }
            defs::ITEM_RGB_COLOR8 => color(message, ArgumentType::ByteArray, 3)?,
            defs::ITEM_RGBA_COLOR8 => color(message, ArgumentType::ByteArray, 4)?,
            defs::ITEM_RGB_COLOR_FLOAT => color(message, ArgumentType::FloatArray, 3)?,
            defs::ITEM_RGBA_COLOR_FLOAT => color(message, ArgumentType::FloatArray, 4)?,
            defs::ITEM_DROPDOWN => {
                let value = require_value(message, ArgumentType::Int)?;
                let options = message
                    .string_array_arg(defs::ITEM_OPTIONS_ARG)
                    .ok_or_else(|| malformed(&message.id, "missing portal_item_options argument"))?
                    .to_vec();
                (ItemKind::Dropdown { options }, ArgumentType::Int, value)
            }
            defs::ITEM_TEXT_FIELD => {
                let value = require_value(message, ArgumentType::String)?;
                (ItemKind::TextField, ArgumentType::String, value)
            }
            defs::ITEM_TEXT_AREA => {
                let value = require_value(message, ArgumentType::String)?;
                (ItemKind::TextArea, ArgumentType::String, value)
            }
            defs::ITEM_LABEL => {
                let value = require_value(message, ArgumentType::String)?;
                (ItemKind::Label, ArgumentType::String, value)
            }
            defs::ITEM_SEPARATOR => (
                ItemKind::Separator,
                ArgumentType::String,
                ApiValue::String(String::new()),
            ),
            defs::ITEM_VEC2 => vector(message, ArgumentType::FloatArray, 2)?,
            defs::ITEM_VEC3 => vector(message, ArgumentType::FloatArray, 3)?,
            defs::ITEM_IVEC2 => vector(message, ArgumentType::IntArray, 2)?,
            defs::ITEM_IVEC3 => vector(message, ArgumentType::IntArray, 3)?,
            defs::ITEM_OPERATIONAL_CALENDAR => {
                let value = require_value(message, ArgumentType::StringArray)?;
                (
                    ItemKind::OperationalCalendar,
                    ArgumentType::StringArray,
                    value,
                )
            }
            unknown => return Err(PortalError::UnknownItemType(unknown.into())),
        };

        Ok(Self {
            id: message.id.clone(),
            name: message.name.clone(),
            kind,
            value_type,
            value,
            enabled: message.bool_arg(defs::ITEM_ENABLED_ARG).unwrap_or(true),
            visible: message.bool_arg(defs::ITEM_VISIBLE_ARG).unwrap_or(true),
        })
    }

    /// Apply a host-sent value update
    ///
    /// The carried value must match the declared type and shape; a
    /// dropdown update may also replace the option list. Returns the new
    /// value.
    pub(crate) fn update_value(&mut self, message: &ApiMessage) -> Result<ApiValue> {
        let arg = message
            .argument(defs::ITEM_VALUE_ARG)
            .ok_or_else(|| malformed(&self.id, "update without portal_item_value argument"))?;
        if arg.ty != self.value_type {
            return Err(malformed(
                &self.id,
                format!(
                    "update value type {} does not match declared {}",
                    arg.ty.tag(),
                    self.value_type.tag()
                ),
            ));
        }
        self.check_shape(&arg.value)?;

        if let ItemKind::Dropdown { options } = &mut self.kind {
            if let Some(new_options) = message.string_array_arg(defs::ITEM_OPTIONS_ARG) {
                *options = new_options.to_vec();
            }
        }
        self.value = arg.value.clone();
        Ok(self.value.clone())
    }

    /// Apply a host-sent state update; absent arguments leave the current
    /// state untouched
    pub(crate) fn update_state(&mut self, message: &ApiMessage) -> (bool, bool) {
        if let Some(enabled) = message.bool_arg(defs::ITEM_ENABLED_ARG) {
            self.enabled = enabled;
        }
        if let Some(visible) = message.bool_arg(defs::ITEM_VISIBLE_ARG) {
            self.visible = visible;
        }
        (self.enabled, self.visible)
    }

    /// Apply a local edit and package it for transmission
    pub(crate) fn local_edit(&mut self, value: ApiValue) -> Result<ItemUpdateInfo> {
        match self.kind {
            ItemKind::Button { .. } => {
                return Err(PortalError::protocol(format!(
                    "item {} is a button, send a button event instead",
                    self.id
                )));
            }
            ItemKind::Label | ItemKind::Separator => {
                return Err(PortalError::protocol(format!(
                    "item {} is not editable",
                    self.id
                )));
            }
            _ => {}
        }
        if value.argument_type() != self.value_type {
            return Err(PortalError::protocol(format!(
                "value type {} does not match declared {} of item {}",
                value.argument_type().tag(),
                self.value_type.tag(),
                self.id
            )));
        }
        self.check_shape(&value)?;
        self.value = value.clone();
        Ok(ItemUpdateInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            ty: self.value_type,
            value,
        })
    }

    /// Package a button interaction for transmission; the stored value is
    /// not touched
    pub(crate) fn button_event(&self, event: ButtonEvent) -> Result<ItemUpdateInfo> {
        match self.kind {
            ItemKind::Button { .. } => Ok(ItemUpdateInfo {
                id: self.id.clone(),
                name: self.name.clone(),
                ty: ArgumentType::String,
                value: ApiValue::String(event.as_str().into()),
            }),
            _ => Err(PortalError::protocol(format!(
                "item {} is not a button",
                self.id
            ))),
        }
    }

    /// Fixed-length kinds reject values of the wrong component count
    fn check_shape(&self, value: &ApiValue) -> Result<()> {
        let expected = match self.kind {
            ItemKind::Color { channels } => channels,
            ItemKind::Vector { len, .. } => len,
            _ => return Ok(()),
        };
        let got = value.as_f64_array().map(|v| v.len()).unwrap_or(0);
        if got != expected {
            return Err(malformed(
                &self.id,
                format!("expected {expected} components, got {got}"),
            ));
        }
        Ok(())
    }
}

fn require_value(message: &ApiMessage, expected: ArgumentType) -> Result<ApiValue> {
    let arg = message
        .argument(defs::ITEM_VALUE_ARG)
        .ok_or_else(|| malformed(&message.id, "missing portal_item_value argument"))?;
    if arg.ty != expected {
        return Err(malformed(
            &message.id,
            format!("expected {} value, got {}", expected.tag(), arg.ty.tag()),
        ));
    }
    Ok(arg.value.clone())
}

fn require_numeric(message: &ApiMessage, name: &str) -> Result<f64> {
    message
        .numeric_arg(name)
        .ok_or_else(|| malformed(&message.id, format!("missing numeric {name} argument")))
}

fn slider(
    message: &ApiMessage,
    scalar: ArgumentType,
) -> Result<(ItemKind, ArgumentType, ApiValue)> {
    let value = require_value(message, scalar)?;
    let min = require_numeric(message, defs::ITEM_MIN_ARG)?;
    let max = require_numeric(message, defs::ITEM_MAX_ARG)?;
    Ok((ItemKind::Slider { min, max }, scalar, value))
}

fn color(
    message: &ApiMessage,
    array: ArgumentType,
    channels: usize,
) -> Result<(ItemKind, ArgumentType, ApiValue)> {
    let value = require_value(message, array)?;
    let got = value.as_f64_array().map(|v| v.len()).unwrap_or(0);
    if got != channels {
        return Err(malformed(
            &message.id,
            format!("expected {channels} color channels, got {got}"),
        ));
    }
    Ok((ItemKind::Color { channels }, array, value))
}

fn vector(
    message: &ApiMessage,
    array: ArgumentType,
    len: usize,
) -> Result<(ItemKind, ArgumentType, ApiValue)> {
    let value = require_value(message, array)?;
    let got = value.as_f64_array().map(|v| v.len()).unwrap_or(0);
    if got != len {
        return Err(malformed(
            &message.id,
            format!("expected {len} vector components, got {got}"),
        ));
    }
    let min = require_numeric(message, defs::ITEM_MIN_ARG)?;
    let max = require_numeric(message, defs::ITEM_MAX_ARG)?;
    Ok((ItemKind::Vector { min, max, len }, array, value))
}
