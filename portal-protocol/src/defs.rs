//! Protocol constant tables
//!
//! One canonical, versioned set of names. Historical deployments disagree
//! on some of these; only this set is supported.

/// Type discriminator carried by every message
pub const API_MESSAGE_TYPE: &str = "nap::APIMessage";

/// Name of the distinguished header message at the start of every frame
pub const EVENT_HEADER_NAME: &str = "portal_event_header";

/// Header argument: target portal component identifier
pub const PORTAL_ID_ARG: &str = "portal_id";

/// Header argument: event kind discriminator
pub const EVENT_TYPE_ARG: &str = "portal_event_type";

// === Item argument names ===

pub const ITEM_TYPE_ARG: &str = "portal_item_type";
pub const ITEM_VALUE_ARG: &str = "portal_item_value";
pub const ITEM_MIN_ARG: &str = "portal_item_min";
pub const ITEM_MAX_ARG: &str = "portal_item_max";
pub const ITEM_OPTIONS_ARG: &str = "portal_item_options";
pub const ITEM_ALIGNMENT_ARG: &str = "portal_item_alignment";
pub const ITEM_ENABLED_ARG: &str = "portal_item_enabled";
pub const ITEM_VISIBLE_ARG: &str = "portal_item_visible";

// === Dialog argument names ===

pub const DIALOG_TITLE_ARG: &str = "portal_dialog_title";
pub const DIALOG_CONTENT_ARG: &str = "portal_dialog_content";
pub const DIALOG_OPTIONS_ARG: &str = "portal_dialog_options";
pub const DIALOG_SELECTION_ARG: &str = "portal_dialog_selection";

// === Item type discriminator values ===

pub const ITEM_SLIDER_BYTE: &str = "nap::PortalItemSliderByte";
pub const ITEM_SLIDER_INT: &str = "nap::PortalItemSliderInt";
pub const ITEM_SLIDER_LONG: &str = "nap::PortalItemSliderLong";
pub const ITEM_SLIDER_FLOAT: &str = "nap::PortalItemSliderFloat";
pub const ITEM_SLIDER_DOUBLE: &str = "nap::PortalItemSliderDouble";
pub const ITEM_TOGGLE: &str = "nap::PortalItemToggle";
pub const ITEM_BUTTON: &str = "nap::PortalItemButton";
pub const ITEM_RGB_COLOR8: &str = "nap::PortalItemRGBColor8";
pub const ITEM_RGBA_COLOR8: &str = "nap::PortalItemRGBAColor8";
pub const ITEM_RGB_COLOR_FLOAT: &str = "nap::PortalItemRGBColorFloat";
pub const ITEM_RGBA_COLOR_FLOAT: &str = "nap::PortalItemRGBAColorFloat";
pub const ITEM_DROPDOWN: &str = "nap::PortalItemDropDown";
pub const ITEM_TEXT_FIELD: &str = "nap::PortalItemTextField";
pub const ITEM_TEXT_AREA: &str = "nap::PortalItemTextArea";
pub const ITEM_LABEL: &str = "nap::PortalItemLabel";
pub const ITEM_SEPARATOR: &str = "nap::PortalItemSeparator";
pub const ITEM_VEC2: &str = "nap::PortalItemVec2";
pub const ITEM_VEC3: &str = "nap::PortalItemVec3";
pub const ITEM_IVEC2: &str = "nap::PortalItemIVec2";
pub const ITEM_IVEC3: &str = "nap::PortalItemIVec3";
pub const ITEM_OPERATIONAL_CALENDAR: &str = "nap::PortalItemOperationalCalendar";

// === Button event values (sent as the item value of a button update) ===

pub const BUTTON_EVENT_CLICK: &str = "Click";
pub const BUTTON_EVENT_PRESS: &str = "Press";
pub const BUTTON_EVENT_RELEASE: &str = "Release";

/// Reason string sent with the intentional close frame (code 1000)
pub const CLOSE_REASON: &str = "portal client disconnect";
