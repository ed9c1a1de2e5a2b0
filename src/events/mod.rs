use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Events emitted by services after successful mutations. Consumed by the
/// background processing loop; delivery is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Packaging type events
    PackagingTypeCreated(i64),
    PackagingTypeUpdated(i64),
    PackagingTypeDeleted(i64),
    ParentAssigned {
        packaging_type_id: i64,
        parent_id: i64,
    },
    QuantityPropagated {
        root_id: i64,
        amount: Decimal,
        nodes_updated: u64,
    },

    // Packaging material events
    MaterialCreated(i64),
    MaterialUpdated(i64),
    MaterialDeleted(i64),
    MaterialAllocated {
        warehouse_id: i64,
        material_id: i64,
        quantity: Decimal,
    },

    // Sales events
    SaleRecorded {
        sales_record_id: i64,
        package_id: i64,
        quantity: i32,
        total_cost: Decimal,
    },
    PackageDelivered(i64),

    // Label queue events
    LabelQueued {
        packaging_type_id: i64,
        queue_position: usize,
    },
    LabelRemoved {
        packaging_type_id: i64,
        removed: usize,
    },
    LabelStatusUpdated {
        packaging_type_id: i64,
        status: String,
    },

    // Party events
    CustomerCreated(i64),
    SupplierCreated(i64),
    WarehouseCreated(i64),
    ItemCreated(i64),
}

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

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Mutations must not be rolled back because telemetry lagged.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Dropping event: {}", e);
        }
    }
}

/// Background loop draining the event channel. Currently logs each event;
/// the seam where webhook or outbox delivery would hang off.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SaleRecorded {
                sales_record_id,
                package_id,
                quantity,
                total_cost,
            } => {
                info!(
                    sales_record_id,
                    package_id,
                    quantity,
                    %total_cost,
                    "Sale recorded"
                );
            }
            Event::QuantityPropagated {
                root_id,
                amount,
                nodes_updated,
            } => {
                info!(root_id, %amount, nodes_updated, "Quantity decrement propagated");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed; event processing loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender.send(Event::PackagingTypeCreated(1)).await.unwrap();

        match rx.recv().await {
            Some(Event::PackagingTypeCreated(1)) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or return an error to the caller.
        sender.send_or_log(Event::CustomerCreated(9)).await;
    }
}
