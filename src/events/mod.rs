use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::device_log::MovementMode;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Things that happened to the ledger, published after the writes landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    DeviceCreated {
        device_id: Uuid,
        qty: i64,
    },
    MovementRecorded {
        device_id: Uuid,
        devicelog_id: Uuid,
        mode: MovementMode,
        qty: i64,
        author_id: String,
    },
    MovementReversed {
        device_id: Uuid,
        devicelog_id: Uuid,
        mode: MovementMode,
        qty: i64,
    },
    /// `cascade` is true when the device was removed for running out of stock
    /// after a reversal, false for a direct retirement.
    DeviceDeleted {
        device_id: Uuid,
        cascade: bool,
    },
}

/// Channel pair sized from configuration.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::DeviceCreated { device_id, qty } => {
                info!(%device_id, qty, "event: device created");
            }
            Event::MovementRecorded {
                device_id,
                devicelog_id,
                mode,
                qty,
                author_id,
            } => {
                info!(%device_id, %devicelog_id, %mode, qty, %author_id, "event: movement recorded");
            }
            Event::MovementReversed {
                device_id,
                devicelog_id,
                mode,
                qty,
            } => {
                info!(%device_id, %devicelog_id, %mode, qty, "event: movement reversed");
            }
            Event::DeviceDeleted { device_id, cascade } => {
                if cascade {
                    info!(%device_id, "event: depleted device deleted");
                } else {
                    warn!(%device_id, "event: device retired");
                }
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_in_order() {
        let (sender, mut rx) = channel(4);
        let device_id = Uuid::new_v4();

        sender
            .send(Event::DeviceCreated { device_id, qty: 3 })
            .await
            .unwrap();
        sender
            .send(Event::DeviceDeleted {
                device_id,
                cascade: true,
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Event::DeviceCreated { device_id, qty: 3 }));
        assert_eq!(
            rx.recv().await,
            Some(Event::DeviceDeleted {
                device_id,
                cascade: true
            })
        );
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = channel(1);
        drop(rx);

        let result = sender
            .send(Event::DeviceCreated {
                device_id: Uuid::new_v4(),
                qty: 1,
            })
            .await;
        assert!(result.is_err());
    }
}
