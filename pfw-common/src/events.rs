//! Event types for the Prooflow workflow event system

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Workflow events broadcast to in-process subscribers. Delivery is
/// best-effort: lagging or absent subscribers never block the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// A user's progress row changed (step advance or selection patch)
    ProgressUpdated {
        user_id: Uuid,
        pool_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A finalize call committed
    FinalizeCompleted {
        user_id: Uuid,
        pool_id: Uuid,
        moved: usize,
        conflicts: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Photos were removed from a losing user's selections after a
    /// conflicting claim won
    PhotosReclaimed {
        user_id: Uuid,
        pool_id: Uuid,
        removed: Vec<Uuid>,
        winner_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for workflow events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns the number of receivers that saw it;
    /// zero receivers is not an error.
    pub fn publish(&self, event: WorkflowEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(8);
        let delivered = bus.publish(WorkflowEvent::ProgressUpdated {
            user_id: Uuid::new_v4(),
            pool_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let user_id = Uuid::new_v4();

        bus.publish(WorkflowEvent::FinalizeCompleted {
            user_id,
            pool_id: Uuid::new_v4(),
            moved: 2,
            conflicts: 1,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            WorkflowEvent::FinalizeCompleted { user_id: got, moved, conflicts, .. } => {
                assert_eq!(got, user_id);
                assert_eq!(moved, 2);
                assert_eq!(conflicts, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
