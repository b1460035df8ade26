use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services. Delivery is fire-and-forget; the
/// stores of record are the database and the gateway, never the event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CartItemAdded {
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    CartItemUpdated {
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    CartItemRemoved {
        cart_id: Uuid,
        item_id: Uuid,
    },
    CartCleared(Uuid),
    AddressCreated(Uuid),
    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total_minor: i64,
    },
    PaymentIntentCreated {
        order_id: Uuid,
        remote_order_id: String,
    },
    OrderPaid {
        order_id: Uuid,
        remote_payment_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing if the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Event processing loop, spawned once at startup.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPlaced {
                order_id,
                customer_id,
                total_minor,
            } => {
                info!(
                    "Order {} placed by {} for {} minor units",
                    order_id, customer_id, total_minor
                );
            }
            Event::OrderPaid {
                order_id,
                remote_payment_id,
            } => {
                info!(
                    "Order {} confirmed paid (payment {})",
                    order_id, remote_payment_id
                );
            }
            Event::PaymentIntentCreated {
                order_id,
                remote_order_id,
            } => {
                info!(
                    "Payment intent {} created for order {}",
                    remote_order_id, order_id
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
