use crate::{
    config::AppConfig,
    entities::{address, cart, cart_item, order, order_item, product, Address, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::OrderDetail,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Checkout orchestrator: converts the principal's cart into a pending order.
///
/// Order creation, stock reservation and cart clearing commit as one
/// transaction; on any failure no partial state is observable.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Places an order from the principal's cart, shipping to `address_id`.
    #[instrument(skip(self))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        // Validation order matters: address, then cart contents, then stock.
        let shipping_address = Address::find()
            .filter(address::Column::Id.eq(address_id))
            .filter(address::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::AddressNotFound)?;

        let cart = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::EmptyCart)?;

        let mut lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        // Fixed decrement order so concurrent checkouts sharing products
        // take row locks in the same sequence.
        lines.sort_by_key(|line| line.product_id);

        // Advisory stock check, to fail fast with a precise message. The
        // conditional decrement inside the transaction is the authoritative one.
        let products = self.load_products(&*self.db, &lines).await?;
        for line in &lines {
            let product = products.get(&line.product_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;
            if line.quantity > product.stock_qty {
                return Err(ServiceError::InsufficientStock(product.title.clone()));
            }
        }

        let txn = self.db.begin().await?;

        // Prices must come from reads inside the transaction; the advisory
        // snapshot above may already be stale.
        let products = self.load_products(&txn, &lines).await?;

        let mut total_minor: i64 = 0;
        for line in &lines {
            let product = products.get(&line.product_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;
            total_minor += i64::from(line.quantity) * product.price_minor;
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order_row = order::ActiveModel {
            id: Set(order_id),
            customer_id: Set(customer_id),
            address_id: Set(address_id),
            status: Set(order::OrderStatus::Pending),
            total_minor: Set(total_minor),
            currency: Set(self.config.currency.clone()),
            created_at: Set(now),
        };
        let order_row = order_row.insert(&txn).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = &products[&line.product_id];
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price_minor: Set(product.price_minor),
                created_at: Set(now),
            };
            items.push(item.insert(&txn).await?);
        }

        // Atomic conditional decrement per line. Zero rows affected means the
        // stock moved under us; abort the whole transaction.
        for line in &lines {
            let result = Product::update_many()
                .col_expr(
                    product::Column::StockQty,
                    Expr::col(product::Column::StockQty).sub(line.quantity),
                )
                .filter(product::Column::Id.eq(line.product_id))
                .filter(product::Column::StockQty.gte(line.quantity))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                let title = products[&line.product_id].title.clone();
                txn.rollback().await?;
                return Err(ServiceError::InsufficientStock(title));
            }
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id,
                customer_id,
                total_minor,
            })
            .await;

        info!(
            "Order {} placed for customer {} ({} lines, {} minor units)",
            order_id,
            customer_id,
            items.len(),
            total_minor
        );

        Ok(OrderDetail::from_parts(
            order_row,
            Some(shipping_address),
            items,
        ))
    }

    async fn load_products<C: ConnectionTrait>(
        &self,
        conn: &C,
        lines: &[cart_item::Model],
    ) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
        let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let products = Product::find()
            .filter(product::Column::Id.is_in(ids))
            .all(conn)
            .await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}
