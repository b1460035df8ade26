use crate::{
    entities::{cart, cart_item, product, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    money::minor_to_decimal,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Maximum quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 50;

/// Shopping cart service.
///
/// Every principal owns exactly one cart, created lazily on first access.
/// Stock checks here are a courtesy to fail fast; checkout re-validates
/// everything inside its transaction.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Finds the principal's cart, creating it if this is the first access.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, customer_id: Uuid) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(&*self.db).await?;
        info!("Created cart {} for customer {}", cart.id, customer_id);
        Ok(cart)
    }

    /// Returns the full cart with product details and subtotal.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<CartDetail, ServiceError> {
        let cart = self.get_or_create_cart(customer_id).await?;

        let rows: Vec<(cart_item::Model, Option<product::Model>)> = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        let mut subtotal_minor: i64 = 0;
        for (item, prod) in rows {
            let prod = prod.ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", item.product_id))
            })?;
            let line_total_minor = i64::from(item.quantity) * prod.price_minor;
            subtotal_minor += line_total_minor;
            lines.push(CartLineDetail {
                id: item.id,
                product_id: prod.id,
                title: prod.title,
                quantity: item.quantity,
                unit_price: minor_to_decimal(prod.price_minor),
                line_total: minor_to_decimal(line_total_minor),
                stock_qty: prod.stock_qty,
            });
        }

        Ok(CartDetail {
            id: cart.id,
            customer_id: cart.customer_id,
            items: lines,
            subtotal: minor_to_decimal(subtotal_minor),
        })
    }

    /// Adds a product to the cart, merging with an existing line.
    ///
    /// The merged quantity must not exceed the product's current stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        input: AddToCartInput,
    ) -> Result<cart_item::Model, ServiceError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&input.quantity) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity must be between 1 and {}",
                MAX_LINE_QUANTITY
            )));
        }

        let product = Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let cart = self.get_or_create_cart(customer_id).await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&*self.db)
            .await?;

        let item = match existing {
            Some(existing) => {
                let new_qty = existing.quantity + input.quantity;
                if new_qty > product.stock_qty {
                    return Err(ServiceError::InsufficientStock(product.title));
                }

                let mut update: cart_item::ActiveModel = existing.into();
                update.quantity = Set(new_qty);
                update.updated_at = Set(Utc::now());
                update.update(&*self.db).await?
            }
            None => {
                if input.quantity > product.stock_qty {
                    return Err(ServiceError::InsufficientStock(product.title));
                }

                let now = Utc::now();
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(input.product_id),
                    quantity: Set(input.quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                item.insert(&*self.db).await?
            }
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: input.product_id,
                quantity: item.quantity,
            })
            .await;

        Ok(item)
    }

    /// Sets the quantity of a cart line owned by the principal.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        customer_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity must be between 1 and {}",
                MAX_LINE_QUANTITY
            )));
        }

        let cart = self.get_or_create_cart(customer_id).await?;

        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .filter(|item| item.cart_id == cart.id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        let product = item
            .find_related(Product)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if quantity > product.stock_qty {
            return Err(ServiceError::InsufficientStock(product.title));
        }

        let mut update: cart_item::ActiveModel = item.into();
        update.quantity = Set(quantity);
        update.updated_at = Set(Utc::now());
        let item = update.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: cart.id,
                item_id,
                quantity,
            })
            .await;

        Ok(item)
    }

    /// Removes a cart line owned by the principal.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, customer_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.get_or_create_cart(customer_id).await?;

        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .filter(|item| item.cart_id == cart.id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                item_id,
            })
            .await;

        Ok(())
    }

    /// Deletes all lines from the principal's cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.get_or_create_cart(customer_id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(cart.id)).await;
        Ok(())
    }
}

/// Input for adding a product to the cart
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Cart line enriched with catalog data
#[derive(Debug, Clone, Serialize)]
pub struct CartLineDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub stock_qty: i32,
}

/// Full cart view returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct CartDetail {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<CartLineDetail>,
    pub subtotal: Decimal,
}
