use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain notifications emitted after state changes commit.
///
/// Delivery is best-effort: a full or closed channel never fails the
/// operation that produced the notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockEventsEnqueued {
        tenant_id: Uuid,
        count: u64,
    },
    StockBatchDrained {
        processed: u64,
    },
    StockBatchApplied {
        tenant_id: Uuid,
        context: String,
        count: u64,
    },
    BusinessAggregateResynced {
        tenant_id: Uuid,
        rows: u64,
    },
    BranchCatalogReplicated {
        tenant_id: Uuid,
        branch_id: Uuid,
        rows: u64,
    },
    TransferCreated(Uuid),
    TransferConfirmed(Uuid),
    TransferReceived(Uuid),
    TransferCancelled(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends a notification, logging instead of propagating on failure.
    pub async fn notify(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Consumes domain events and logs them. Collaborators that need richer
/// delivery (webhooks, dashboards) subscribe here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockEventsEnqueued { tenant_id, count } => {
                info!(%tenant_id, count, "stock events enqueued");
            }
            Event::StockBatchDrained { processed } => {
                info!(processed, "stock event batch drained");
            }
            Event::StockBatchApplied {
                tenant_id,
                context,
                count,
            } => {
                info!(%tenant_id, context, count, "stock batch applied");
            }
            Event::BusinessAggregateResynced { tenant_id, rows } => {
                info!(%tenant_id, rows, "business aggregate resynced");
            }
            Event::BranchCatalogReplicated {
                tenant_id,
                branch_id,
                rows,
            } => {
                info!(%tenant_id, %branch_id, rows, "catalog replicated to branch");
            }
            Event::TransferCreated(id) => info!(transfer_id = %id, "transfer created"),
            Event::TransferConfirmed(id) => info!(transfer_id = %id, "transfer confirmed"),
            Event::TransferReceived(id) => info!(transfer_id = %id, "transfer received"),
            Event::TransferCancelled(id) => info!(transfer_id = %id, "transfer cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out.
        sender
            .notify(Event::StockBatchDrained { processed: 0 })
            .await;
    }
}
