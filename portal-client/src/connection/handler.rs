//! Outbound frame handle

use std::sync::{Arc, Mutex};

use tracing::error;

use super::manager::{ConnectionState, Outbound, Shared};

/// Handle for submitting encoded frames to the connection
///
/// Cheap to clone and detached from the connection lifecycle: while the
/// connection is not open, frames are dropped with an error log instead of
/// blocking or failing the caller.
#[derive(Clone)]
pub struct FrameSender {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Live(Arc<Mutex<Shared>>),
    #[cfg(test)]
    Direct(tokio::sync::mpsc::UnboundedSender<String>),
}

impl FrameSender {
    pub(super) fn live(shared: Arc<Mutex<Shared>>) -> Self {
        Self {
            inner: Inner::Live(shared),
        }
    }

    /// A sender that bypasses the connection and hands frames straight to
    /// the given channel, for driving a session without a socket
    #[cfg(test)]
    pub(crate) fn direct(tx: tokio::sync::mpsc::UnboundedSender<String>) -> Self {
        Self {
            inner: Inner::Direct(tx),
        }
    }

    /// Queue a frame for transmission, fire-and-forget
    pub fn send(&self, frame: String) {
        match &self.inner {
            Inner::Live(shared) => {
                let outgoing = {
                    let shared = shared.lock().unwrap();
                    if shared.state != ConnectionState::Open {
                        error!(state = %shared.state, "cannot send: connection is not open");
                        return;
                    }
                    shared.outgoing.clone()
                };
                if let Some(tx) = outgoing {
                    if tx.try_send(Outbound::Frame(frame)).is_err() {
                        error!("outbound queue full, dropping frame");
                    }
                }
            }
            #[cfg(test)]
            Inner::Direct(tx) => {
                let _ = tx.send(frame);
            }
        }
    }
}
