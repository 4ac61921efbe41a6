//! Command line portal client
//!
//! Connects to a portal host, synchronizes the named portal component and
//! logs every item and connection event. Useful for inspecting a host
//! without a renderer attached.

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use portal_client::{ClientConfig, Connection, Portal};
use portal_utils::logging::{init_logging_with_config, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "portal", version, about = "Portal control panel client")]
struct Args {
    /// Identifier of the portal component to mirror
    portal_id: String,

    /// Host name or address of the portal host
    #[arg(long)]
    host: Option<String>,

    /// Port of the portal host
    #[arg(long)]
    port: Option<u16>,

    /// User name for the ticket request
    #[arg(long)]
    user: Option<String>,

    /// Password for the ticket request
    #[arg(long, env = "PORTAL_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Use wss/https instead of ws/http
    #[arg(long)]
    secure: bool,

    /// Log filter, e.g. "portal_client=debug"
    #[arg(long, env = "PORTAL_LOG")]
    log: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(pass) = &self.pass {
            config.pass = pass.clone();
        }
        if self.secure {
            config.secure = true;
        }
    }
}

#[tokio::main]
async fn main() -> portal_utils::Result<()> {
    let args = Args::parse();

    let mut log_config = LogConfig::default();
    if let Some(filter) = &args.log {
        log_config.filter = filter.clone();
    }
    init_logging_with_config(log_config)?;

    let mut config = ClientConfig::load();
    args.apply(&mut config);

    let connection = Connection::new(config);
    let mut events = connection.subscribe();
    let mut portal = Portal::new(&args.portal_id, connection.sender());

    let mut item_events = portal.subscribe();
    tokio::spawn(async move {
        loop {
            match item_events.recv().await {
                Ok(event) => info!(?event, "item event"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "item events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = connection.open().await {
        // A reconnection attempt is already scheduled
        error!(error = %e, "initial connection failed");
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => portal.handle_event(event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "connection events lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                portal.destroy();
                if let Err(e) = connection.close().await {
                    warn!(error = %e, "close failed");
                }
                break;
            }
        }
    }
    Ok(())
}
