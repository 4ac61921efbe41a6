//! Ticket authentication
//!
//! Before the WebSocket handshake, the client POSTs its credentials to the
//! host's HTTP endpoint and receives a single-use connection ticket. The
//! ticket is then offered as the WebSocket subprotocol, which is the only
//! channel the handshake leaves for opaque client data.

use serde_json::json;
use tracing::debug;

use portal_utils::{PortalError, Result};

/// Request a single-use connection ticket from the host
///
/// Any non-success status is a rejection; the response body of a success
/// is the ticket verbatim.
pub async fn fetch_ticket(
    http: &reqwest::Client,
    url: String,
    user: &str,
    pass: &str,
) -> Result<String> {
    debug!(%url, %user, "requesting connection ticket");

    let response = http
        .post(url.as_str())
        .json(&json!({ "user": user, "pass": pass }))
        .send()
        .await
        .map_err(|e| PortalError::ticket(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::TicketRejected {
            url,
            status: status.as_u16(),
        });
    }

    let ticket = response
        .text()
        .await
        .map_err(|e| PortalError::ticket(e.to_string()))?;
    debug!("received connection ticket");
    Ok(ticket)
}
