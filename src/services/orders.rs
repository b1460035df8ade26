use crate::{
    entities::{address, order, order_item, Address, Order, OrderItem},
    errors::ServiceError,
    money::minor_to_decimal,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read side for orders: recency-ordered summaries and full detail, always
/// scoped to the requesting principal.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists the principal's orders, most recent first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, customer_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for item in OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(ids))
            .all(&*self.db)
            .await?
        {
            *counts.entry(item.order_id).or_default() += 1;
        }

        Ok(orders
            .into_iter()
            .map(|o| OrderSummary {
                item_count: counts.get(&o.id).copied().unwrap_or(0),
                id: o.id,
                status: o.status,
                total: minor_to_decimal(o.total_minor),
                currency: o.currency,
                created_at: o.created_at,
            })
            .collect())
    }

    /// Fetches one of the principal's orders with address and lines.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;

        let shipping_address = Address::find()
            .filter(address::Column::Id.eq(order.address_id))
            .one(&*self.db)
            .await?;

        Ok(OrderDetail::from_parts(order, shipping_address, items))
    }
}

/// Order summary for list views
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub status: order::OrderStatus,
    pub total: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
}

/// One order line with boundary-rendered amounts
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Full order view
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: order::OrderStatus,
    pub total: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub address: Option<address::Model>,
    pub items: Vec<OrderLineDetail>,
}

impl OrderDetail {
    pub fn from_parts(
        order: order::Model,
        address: Option<address::Model>,
        items: Vec<order_item::Model>,
    ) -> Self {
        let items = items
            .into_iter()
            .map(|item| OrderLineDetail {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: minor_to_decimal(item.unit_price_minor),
                line_total: minor_to_decimal(
                    i64::from(item.quantity) * item.unit_price_minor,
                ),
            })
            .collect();

        Self {
            id: order.id,
            customer_id: order.customer_id,
            status: order.status,
            total: minor_to_decimal(order.total_minor),
            currency: order.currency,
            created_at: order.created_at,
            address,
            items,
        }
    }
}
