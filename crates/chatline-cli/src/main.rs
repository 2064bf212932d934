//! Chatline terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local server and join as "ada"
//! chatline --server ws://localhost:4000 --name ada
//!
//! # Server from the environment, verbose logs
//! CHATLINE_SERVER=ws://chat.example:4000 chatline --log-level debug
//! ```
//!
//! Lines typed on stdin are sent as messages. `/name <name>` joins or renames,
//! `/away` and `/back` toggle unread counting, `/quit` leaves.

mod frontend;

use std::time::Duration;

use chatline_client::{
    DEFAULT_SERVER_URL, ReconnectPolicy, Session, SessionConfig, SystemEnv, runtime::Runtime,
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::frontend::LineFrontend;

/// Chatline terminal client
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(about = "Terminal client for Chatline chat servers")]
#[command(version)]
struct Args {
    /// WebSocket URL of the chat server
    #[arg(short, long, env = "CHATLINE_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Display name to join with
    #[arg(short, long)]
    name: Option<String>,

    /// Seconds between heartbeats
    #[arg(long, default_value = "30")]
    heartbeat_secs: u64,

    /// Reconnection attempts before giving up
    #[arg(long, default_value = "10")]
    reconnect_attempts: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            policy: ReconnectPolicy {
                reconnection_attempts: self.reconnect_attempts,
                ..ReconnectPolicy::default()
            },
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs.max(1)),
            ..SessionConfig::with_server(self.server.clone())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so they never interleave with the chat on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = args.session_config();
    tracing::info!(server = %config.server_url, "chatline starting");

    let env = SystemEnv::new();
    let session = Session::new(env.clone(), config);
    let frontend = LineFrontend::spawn(args.name);

    Runtime::new(env, session, frontend).run().await?;

    tracing::info!("chatline stopped");
    Ok(())
}
