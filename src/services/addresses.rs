use crate::{
    entities::{address, Address},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Address book service. Addresses are owned by the principal; checkout
/// resolves its shipping address against this table.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an address. Marking it default unsets the previous default.
    #[instrument(skip(self, input))]
    pub async fn create_address(
        &self,
        customer_id: Uuid,
        input: CreateAddressInput,
    ) -> Result<address::Model, ServiceError> {
        if input.is_default {
            Address::update_many()
                .col_expr(address::Column::IsDefault, Expr::value(false))
                .filter(address::Column::CustomerId.eq(customer_id))
                .filter(address::Column::IsDefault.eq(true))
                .exec(&*self.db)
                .await?;
        }

        let row = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            full_name: Set(input.full_name),
            phone: Set(input.phone),
            line1: Set(input.line1),
            line2: Set(input.line2),
            city: Set(input.city),
            state: Set(input.state),
            postal_code: Set(input.postal_code),
            country: Set(input.country.unwrap_or_else(|| "India".to_string())),
            is_default: Set(input.is_default),
            created_at: Set(Utc::now()),
        };

        let created = row.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::AddressCreated(created.id))
            .await;
        Ok(created)
    }

    /// Lists the principal's addresses, default first then most recent.
    #[instrument(skip(self))]
    pub async fn list_addresses(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<address::Model>, ServiceError> {
        let addresses = Address::find()
            .filter(address::Column::CustomerId.eq(customer_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(addresses)
    }
}

/// Input for creating an address
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAddressInput {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: Option<String>,
    pub is_default: bool,
}
