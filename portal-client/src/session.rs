//! Protocol session
//!
//! A [`Portal`] binds one portal component on the host to a local item
//! registry. It owns the session identifier used to correlate its request
//! with the host's response and to recognize echoes of its own updates,
//! and it routes every decoded frame to the registry or to the dialog
//! handler. The session is driven purely by [`Portal::handle_event`], so
//! it holds no socket and no task of its own.

use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use uuid::Uuid;

use portal_protocol::{
    decode_frame, defs, encode_frame, item_update_message, ApiArgument, ApiMessage, ApiValue,
    EventType, Frame, HeaderInfo,
};
use portal_utils::{PortalError, Result};

use crate::connection::{ConnectionEvent, FrameSender};
use crate::items::{ButtonEvent, PortalItem};
use crate::registry::ItemRegistry;

/// Synchronization state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No request sent yet on the current connection
    Uninitialized,
    /// Request sent, response outstanding
    AwaitingResponse,
    /// Registry mirrors the host
    Synchronized,
    /// Destroyed; all events are ignored
    TornDown,
}

/// Registry change notifications for renderers
#[derive(Debug, Clone)]
pub enum ItemEvent {
    Created { id: String },
    Removed { id: String },
    ValueChanged { id: String, value: ApiValue },
    StateChanged { id: String, enabled: bool, visible: bool },
}

/// A host-initiated dialog, handed to the [`DialogHandler`]
#[derive(Debug, Clone, PartialEq)]
pub struct DialogRequest {
    /// Host-generated event id; pass it back via [`Portal::close_dialog`]
    pub id: String,
    pub title: String,
    pub content: String,
    /// Button labels; the selection reported back is an index into these
    pub options: Vec<String>,
}

/// Presents host-initiated dialogs to the user
pub trait DialogHandler: Send {
    fn open_dialog(&mut self, request: DialogRequest);
}

/// Session for one portal component
pub struct Portal {
    session_id: String,
    portal_id: String,
    state: SessionState,
    registry: ItemRegistry,
    sender: FrameSender,
    events: broadcast::Sender<ItemEvent>,
    dialog: Option<Box<dyn DialogHandler>>,
}

impl Portal {
    /// Create a session for the named portal component
    pub fn new(portal_id: impl Into<String>, sender: FrameSender) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            session_id: Uuid::new_v4().to_string(),
            portal_id: portal_id.into(),
            state: SessionState::Uninitialized,
            registry: ItemRegistry::new(),
            sender,
            events,
            dialog: None,
        }
    }

    /// Correlation id of this session, unique per instance
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Identifier of the portal component this session mirrors
    pub fn portal_id(&self) -> &str {
        &self.portal_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Subscribe to registry change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.events.subscribe()
    }

    /// Install the handler for host-initiated dialogs
    pub fn set_dialog_handler(&mut self, handler: Box<dyn DialogHandler>) {
        self.dialog = Some(handler);
    }

    /// Items in host layout order
    pub fn items(&self) -> impl Iterator<Item = &PortalItem> {
        self.registry.iter()
    }

    pub fn item(&self, id: &str) -> Option<&PortalItem> {
        self.registry.get(id)
    }

    /// Drive the session with a connection event
    ///
    /// A fresh connection triggers a (re)synchronization request; inbound
    /// frames are decoded, and frames that fail validation are dropped as
    /// a whole. A torn down session ignores everything.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        if self.state == SessionState::TornDown {
            return;
        }
        match event {
            ConnectionEvent::Opened => self.send_request(),
            ConnectionEvent::Closed => {
                debug!(portal_id = %self.portal_id, "connection lost, keeping last known items");
                self.state = SessionState::Uninitialized;
            }
            ConnectionEvent::Message(raw) => match decode_frame(&raw) {
                Ok(frame) => self.handle_frame(frame),
                Err(e) => warn!(error = %e, "dropping invalid frame"),
            },
        }
    }

    /// Apply a local edit and send it to the host
    pub fn edit_value(&mut self, id: &str, value: ApiValue) -> Result<()> {
        if self.state == SessionState::TornDown {
            return Err(PortalError::protocol("session is torn down"));
        }
        let item = self
            .registry
            .get_mut(id)
            .ok_or_else(|| PortalError::ItemNotFound(id.into()))?;
        let info = item.local_edit(value)?;
        self.transmit(
            self.session_id.clone(),
            EventType::ValueUpdate,
            &[item_update_message(&info)],
        );
        Ok(())
    }

    /// Report a button interaction to the host
    pub fn press_button(&mut self, id: &str, event: ButtonEvent) -> Result<()> {
        if self.state == SessionState::TornDown {
            return Err(PortalError::protocol("session is torn down"));
        }
        let item = self
            .registry
            .get(id)
            .ok_or_else(|| PortalError::ItemNotFound(id.into()))?;
        let info = item.button_event(event)?;
        self.transmit(
            self.session_id.clone(),
            EventType::ValueUpdate,
            &[item_update_message(&info)],
        );
        Ok(())
    }

    /// Report the user's choice for a dialog back to the host
    ///
    /// `dialog_id` is the id carried by the [`DialogRequest`]; `selection`
    /// indexes its option list.
    pub fn close_dialog(&mut self, dialog_id: &str, selection: i32) {
        let message = ApiMessage::new(
            Uuid::new_v4().to_string(),
            defs::DIALOG_SELECTION_ARG,
            vec![ApiArgument::new(
                defs::DIALOG_SELECTION_ARG,
                ApiValue::Int(selection),
            )],
        );
        self.transmit(dialog_id.to_string(), EventType::DialogClosed, &[message]);
    }

    /// Tear the session down; the registry is emptied and every later
    /// event is ignored
    pub fn destroy(&mut self) {
        self.clear_items();
        self.state = SessionState::TornDown;
    }

    fn send_request(&mut self) {
        debug!(portal_id = %self.portal_id, "requesting portal items");
        self.state = SessionState::AwaitingResponse;
        self.transmit(self.session_id.clone(), EventType::Request, &[]);
    }

    fn handle_frame(&mut self, frame: Frame) {
        if frame.header.portal_id != self.portal_id {
            debug!(portal_id = %frame.header.portal_id, "ignoring frame for other portal");
            return;
        }
        match frame.header.event_type {
            EventType::Response => self.handle_response(frame),
            EventType::ValueUpdate => {
                if frame.header.event_id == self.session_id {
                    debug!("ignoring echo of own value update");
                    return;
                }
                for message in &frame.messages {
                    match self.registry.update_value(message) {
                        Ok(value) => {
                            let _ = self.events.send(ItemEvent::ValueChanged {
                                id: message.id.clone(),
                                value,
                            });
                        }
                        Err(e) => error!(error = %e, "failed to apply value update"),
                    }
                }
            }
            EventType::StateUpdate => {
                if frame.header.event_id == self.session_id {
                    debug!("ignoring echo of own state update");
                    return;
                }
                for message in &frame.messages {
                    match self.registry.update_state(message) {
                        Ok((enabled, visible)) => {
                            let _ = self.events.send(ItemEvent::StateChanged {
                                id: message.id.clone(),
                                enabled,
                                visible,
                            });
                        }
                        Err(e) => error!(error = %e, "failed to apply state update"),
                    }
                }
            }
            EventType::Reload => self.send_request(),
            EventType::OpenDialog => self.handle_open_dialog(frame),
            EventType::Request | EventType::DialogClosed | EventType::Invalid => {
                warn!(event_type = frame.header.event_type.tag(), "cannot handle event");
            }
        }
    }

    /// Full resynchronization: the response replaces the registry wholesale
    fn handle_response(&mut self, frame: Frame) {
        if frame.header.event_id != self.session_id {
            debug!("ignoring response for another session");
            return;
        }
        self.clear_items();
        for message in &frame.messages {
            match self.registry.create(message) {
                Ok(item) => {
                    let _ = self.events.send(ItemEvent::Created {
                        id: item.id.clone(),
                    });
                }
                Err(e) => error!(error = %e, "failed to create portal item"),
            }
        }
        self.state = SessionState::Synchronized;
        debug!(items = self.registry.len(), "portal synchronized");
    }

    fn handle_open_dialog(&mut self, frame: Frame) {
        let [message] = frame.messages.as_slice() else {
            warn!(
                count = frame.messages.len(),
                "dialog event must carry exactly one message"
            );
            return;
        };
        let (Some(title), Some(content), Some(options)) = (
            message.string_arg(defs::DIALOG_TITLE_ARG),
            message.string_arg(defs::DIALOG_CONTENT_ARG),
            message.string_array_arg(defs::DIALOG_OPTIONS_ARG),
        ) else {
            warn!("dialog event missing title, content or options");
            return;
        };
        let request = DialogRequest {
            id: frame.header.event_id.clone(),
            title: title.to_string(),
            content: content.to_string(),
            options: options.to_vec(),
        };
        match &mut self.dialog {
            Some(handler) => handler.open_dialog(request),
            None => warn!(title = %request.title, "no dialog handler installed, dropping dialog"),
        }
    }

    fn clear_items(&mut self) {
        for id in self.registry.clear() {
            let _ = self.events.send(ItemEvent::Removed { id });
        }
    }

    fn transmit(&self, event_id: String, event_type: EventType, messages: &[ApiMessage]) {
        let info = HeaderInfo {
            event_id,
            portal_id: self.portal_id.clone(),
            event_type,
        };
        match encode_frame(&info, messages) {
            Ok(raw) => self.sender.send(raw),
            Err(e) => error!(error = %e, "failed to encode frame"),
        }
    }
}
