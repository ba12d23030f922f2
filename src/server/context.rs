// src/server/context.rs

use super::transport::TcpTransport;
use crate::config::Config;
use crate::core::events::{EventLoop, EventSender};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the server.
pub struct ServerContext {
    pub config: Config,
    pub transport: TcpTransport,
    pub events: EventSender,
    /// Taken by the spawner when the event loop task starts.
    pub event_loop: Option<EventLoop>,
    pub admin_listener: Option<TcpListener>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
