// src/core/events.rs

//! The event ingestion queue between the socket engine and the dispatcher.
//!
//! Socket tasks deliver notifications concurrently through an `EventSender`;
//! a single `EventLoop` task consumes them one at a time, so all session and
//! transfer state is mutated from one place.

use crate::core::handler::Dispatcher;
use crate::core::{ConnectionId, TransportCallbacks, metrics};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

/// The default capacity of the ingestion queue.
/// Large enough that a burst of traffic never reaches it under normal load.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 65536;

/// A notification from the socket engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Connected {
        id: ConnectionId,
        remote_addr: String,
    },
    Disconnected {
        id: ConnectionId,
    },
    MessageReceived {
        id: ConnectionId,
        msg_type: u16,
        payload: Bytes,
    },
    TransportError {
        code: i32,
        message: String,
    },
}

impl InboundEvent {
    /// Connection lifecycle events bypass the capacity limit.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            InboundEvent::Connected { .. } | InboundEvent::Disconnected { .. }
        )
    }
}

/// Creates the ingestion queue.
///
/// `capacity` bounds the number of queued messages and transport errors.
/// Connect and disconnect notifications are always accepted and keep their
/// place in the order relative to the messages around them.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queued = Arc::new(AtomicUsize::new(0));
    (
        EventSender {
            tx,
            queued: queued.clone(),
            capacity,
        },
        EventReceiver { rx, queued },
    )
}

/// The producer side of the queue. Cheap to clone; never blocks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<InboundEvent>,
    queued: Arc<AtomicUsize>,
    capacity: usize,
}

impl EventSender {
    /// Enqueues an event without waiting. Returns false if it was dropped.
    pub fn offer(&self, event: InboundEvent) -> bool {
        if self.tx.is_closed() {
            metrics::DROPPED_EVENTS_TOTAL.inc();
            debug!("Event queue is closed. Dropping event.");
            return false;
        }

        let bounded = !event.is_lifecycle();
        if bounded
            && self
                .queued
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < self.capacity).then_some(n + 1)
                })
                .is_err()
        {
            metrics::DROPPED_EVENTS_TOTAL.inc();
            error!(
                "Event queue is full. Dropping event: {:?}",
                EventSummary(&event)
            );
            return false;
        }

        if self.tx.send(event).is_err() {
            if bounded {
                self.queued.fetch_sub(1, Ordering::AcqRel);
            }
            metrics::DROPPED_EVENTS_TOTAL.inc();
            debug!("Event queue is closed. Dropping event.");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The consumer side of the queue.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<InboundEvent>,
    queued: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Receives the next event, or `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        let event = self.rx.recv().await?;
        if !event.is_lifecycle() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
        }
        Some(event)
    }

    /// Stops accepting new events; already queued ones can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl TransportCallbacks for EventSender {
    fn on_connected(&self, id: ConnectionId, remote_addr: String) {
        self.offer(InboundEvent::Connected { id, remote_addr });
    }

    fn on_disconnected(&self, id: ConnectionId) {
        self.offer(InboundEvent::Disconnected { id });
    }

    fn on_message(&self, id: ConnectionId, msg_type: u16, payload: Bytes) {
        self.offer(InboundEvent::MessageReceived {
            id,
            msg_type,
            payload,
        });
    }

    fn on_error(&self, code: i32, message: String) {
        self.offer(InboundEvent::TransportError { code, message });
    }
}

/// Logs an event without dumping payload bytes.
struct EventSummary<'a>(&'a InboundEvent);

impl std::fmt::Debug for EventSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            InboundEvent::MessageReceived {
                id,
                msg_type,
                payload,
            } => write!(
                f,
                "MessageReceived {{ id: {id}, msg_type: {msg_type}, len: {} }}",
                payload.len()
            ),
            other => write!(f, "{other:?}"),
        }
    }
}

/// The single consumer of the ingestion queue.
pub struct EventLoop {
    dispatcher: Dispatcher,
    rx: EventReceiver,
}

impl EventLoop {
    pub fn new(dispatcher: Dispatcher, rx: EventReceiver) -> Self {
        Self { dispatcher, rx }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handles one event.
    pub async fn process(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Connected { id, remote_addr } => {
                self.dispatcher.on_connected(id, remote_addr);
            }
            InboundEvent::Disconnected { id } => {
                self.dispatcher.on_disconnected(id).await;
            }
            InboundEvent::MessageReceived {
                id,
                msg_type,
                payload,
            } => {
                self.dispatcher.dispatch(id, msg_type, payload).await;
            }
            InboundEvent::TransportError { code, message } => {
                self.dispatcher.on_transport_error(code, &message);
            }
        }
    }

    /// Consumes events until shutdown or until every sender is gone.
    ///
    /// On shutdown the queue is closed to new events, whatever is already queued
    /// is processed, and then every in-flight transfer is cancelled. The
    /// dispatcher is handed back so callers can inspect the final state.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Dispatcher {
        info!("Event loop started.");
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Event loop received shutdown signal.");
                    break;
                }

                event = self.rx.recv() => {
                    match event {
                        Some(event) => self.process(event).await,
                        None => {
                            debug!("All event senders dropped.");
                            break;
                        }
                    }
                }
            }
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Some(event) = self.rx.recv().await {
            self.process(event).await;
            drained += 1;
        }
        if drained > 0 {
            info!("Processed {} queued events during shutdown.", drained);
        }

        self.dispatcher.shutdown().await;
        info!("Event loop stopped.");
        self.dispatcher
    }
}
