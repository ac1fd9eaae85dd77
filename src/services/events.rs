//! Event system for core mutations
//!
//! Services emit an event after every successful write. The daemon attaches
//! a logging listener that turns them into an audit trail. Visibility never
//! depends on these events; it is always recomputed from stored rows.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::models::{ActorId, Role};

/// Events emitted by services
#[derive(Debug, Clone)]
pub enum PairEvent {
    ActorRegistered {
        id: ActorId,
        role: Role,
    },
    ProfileUpdated {
        id: ActorId,
    },
    AssignmentCreated {
        id: String,
        advisor_id: ActorId,
        client_id: ActorId,
    },
    PortfolioCreated {
        id: String,
        advisor_id: ActorId,
        client_id: ActorId,
    },
    PortfolioUpdated {
        id: String,
    },
    PortfolioPublished {
        id: String,
        client_id: ActorId,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &PairEvent);
}

/// Event bus for broadcasting mutation events
pub struct EventBus {
    sender: broadcast::Sender<PairEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: PairEvent) {
        trace!(event = ?event, "Emitting event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PairEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &PairEvent) {
        match event {
            PairEvent::ActorRegistered { id, role } => {
                info!(actor = %id, role = %role, "Actor registered");
            }
            PairEvent::AssignmentCreated { id, advisor_id, client_id } => {
                info!(assignment = %id, advisor = %advisor_id, client = %client_id, "Assignment created");
            }
            PairEvent::PortfolioPublished { id, client_id } => {
                info!(portfolio = %id, client = %client_id, "Portfolio published");
            }
            _ => {
                debug!(event = ?event, "Event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(PairEvent::AssignmentCreated {
            id: "asg-1".into(),
            advisor_id: "adv-1".into(),
            client_id: "cli-1".into(),
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            PairEvent::AssignmentCreated { id, client_id, .. } => {
                assert_eq!(id, "asg-1");
                assert_eq!(client_id.as_str(), "cli-1");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(PairEvent::PortfolioUpdated { id: "pf-1".into() });
    }
}
