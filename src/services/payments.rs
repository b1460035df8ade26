use crate::{
    config::AppConfig,
    entities::{order, Order},
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{CreateRemoteOrder, PaymentGateway, RemoteOrderNotes},
};
use hmac::{Hmac, Mac};
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Payment intent bridge and reconciler.
///
/// Bridges a pending order to a remote gateway intent, and later verifies the
/// gateway's completion callback before flipping the order to paid. The only
/// local state it mutates is the order status, via a single conditional
/// update.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            gateway,
            event_sender,
            config,
        }
    }

    /// Creates a remote payment intent for one of the principal's pending
    /// orders.
    ///
    /// The local order id travels to the gateway as metadata on the remote
    /// order; reconciliation later reads it back from the gateway rather than
    /// trusting the callback payload.
    #[instrument(skip(self))]
    pub async fn create_intent(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentIntentResponse, ServiceError> {
        let order = Order::find()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if order.status == order::OrderStatus::Paid {
            return Err(ServiceError::AlreadyPaid);
        }

        let amount = order.total_minor;
        if amount <= 0 {
            warn!("Order {} carries non-positive total {}", order.id, amount);
            return Err(ServiceError::InvalidAmount);
        }

        let order_id_str = order.id.to_string();
        let receipt = format!("o_{}", &order_id_str[..10]);
        let remote = self
            .gateway
            .create_order(&CreateRemoteOrder {
                amount,
                currency: order.currency.clone(),
                receipt,
                notes: RemoteOrderNotes {
                    app_order_id: Some(order_id_str),
                },
            })
            .await?;

        self.event_sender
            .send_or_log(Event::PaymentIntentCreated {
                order_id: order.id,
                remote_order_id: remote.id.clone(),
            })
            .await;

        Ok(PaymentIntentResponse {
            key_id: self.config.gateway_key_id.clone(),
            remote_order_id: remote.id,
            amount: remote.amount,
            currency: remote.currency,
            order_id: order.id,
        })
    }

    /// Verifies a payment completion callback and settles the order.
    ///
    /// Every step is mandatory and order-significant: signature first, then
    /// an independent fetch of the remote order to check the metadata binding,
    /// then a conditional pending → paid transition. Redelivered callbacks hit
    /// the collapsed "not found or already settled" outcome, which makes the
    /// operation idempotent.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn confirm_payment(
        &self,
        customer_id: Uuid,
        input: ConfirmPaymentInput,
    ) -> Result<(), ServiceError> {
        let expected = sign_callback(
            &self.config.gateway_key_secret,
            &input.remote_order_id,
            &input.remote_payment_id,
        );
        if !constant_time_eq(&expected, &input.signature) {
            warn!("Rejected payment callback with invalid signature");
            return Err(ServiceError::InvalidSignature);
        }

        // Independent-source verification: the claimed order id must match
        // the id bound into the remote order's metadata at intent creation.
        let remote = self.gateway.fetch_order(&input.remote_order_id).await?;
        let bound_order_id = remote
            .notes
            .app_order_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok());
        if bound_order_id != Some(input.order_id) {
            warn!(
                "Payment callback for remote order {} does not map to order {}",
                input.remote_order_id, input.order_id
            );
            return Err(ServiceError::OrderMappingMismatch);
        }

        let result = Order::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(order::OrderStatus::Paid),
            )
            .filter(order::Column::Id.eq(input.order_id))
            .filter(order::Column::CustomerId.eq(customer_id))
            .filter(order::Column::Status.eq(order::OrderStatus::Pending))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            // Deliberately collapsed: "not mine" and "already paid" are
            // indistinguishable to the caller.
            return Err(ServiceError::OrderNotSettleable);
        }

        self.event_sender
            .send_or_log(Event::OrderPaid {
                order_id: input.order_id,
                remote_payment_id: input.remote_payment_id.clone(),
            })
            .await;

        info!("Order {} marked paid", input.order_id);
        Ok(())
    }
}

/// Computes the expected callback signature: hex HMAC-SHA256 over
/// `remote_order_id|remote_payment_id`.
pub fn sign_callback(secret: &str, remote_order_id: &str, remote_payment_id: &str) -> String {
    let payload = format!("{}|{}", remote_order_id, remote_payment_id);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Input for confirming a payment callback
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentInput {
    pub order_id: Uuid,
    pub remote_order_id: String,
    pub remote_payment_id: String,
    pub signature: String,
}

/// Handed to the client-side checkout flow; never carries the gateway secret.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    pub key_id: String,
    pub remote_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub order_id: Uuid,
}
