use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db,
    entities::{order, product, Order, Product},
    errors::ServiceError,
    events::{self, EventSender},
    gateway::{CreateRemoteOrder, PaymentGateway, RemoteOrder},
    handlers::AppServices,
    AppState,
};

/// Test harness: application state backed by an in-memory SQLite database and
/// a scripted in-process payment gateway.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub gateway: Arc<MockGateway>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 18_080, "test");
        // A single pooled connection keeps every query on the same in-memory db.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = Arc::new(MockGateway::default());
        let config = Arc::new(cfg);
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            config.clone(),
            gateway.clone(),
        );

        let state = Arc::new(AppState {
            db: db_arc,
            config,
            event_sender,
            services,
        });
        let router = storefront_api::app(state.clone());

        Self {
            state,
            router,
            gateway,
            _event_task: event_task,
        }
    }

    pub fn gateway_secret(&self) -> &str {
        &self.state.config.gateway_key_secret
    }

    /// Insert a catalog product and return its id.
    pub async fn seed_product(&self, title: &str, price_minor: i64, stock_qty: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
            price_minor: Set(price_minor),
            stock_qty: Set(stock_qty),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed product");
        id
    }

    /// Insert a shipping address owned by `customer_id` and return its id.
    pub async fn seed_address(&self, customer_id: Uuid) -> Uuid {
        use storefront_api::services::addresses::CreateAddressInput;

        let address = self
            .state
            .services
            .addresses
            .create_address(
                customer_id,
                CreateAddressInput {
                    full_name: "Test Customer".to_string(),
                    phone: "9999999999".to_string(),
                    line1: "42 Test Lane".to_string(),
                    line2: None,
                    city: "Testville".to_string(),
                    state: "Test State".to_string(),
                    postal_code: "560001".to_string(),
                    country: None,
                    is_default: true,
                },
            )
            .await
            .expect("failed to seed address");
        address.id
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        Product::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("query failed")
            .expect("product missing")
            .stock_qty
    }

    pub async fn order_status(&self, order_id: Uuid) -> order::OrderStatus {
        Order::find_by_id(order_id)
            .one(&*self.state.db)
            .await
            .expect("query failed")
            .expect("order missing")
            .status
    }

    pub async fn order_count(&self) -> usize {
        Order::find()
            .all(&*self.state.db)
            .await
            .expect("query failed")
            .len()
    }

    /// Insert an order row directly, bypassing checkout. Used to set up
    /// corrupted or cross-tenant states the public API will not produce.
    pub async fn seed_order(&self, customer_id: Uuid, address_id: Uuid, total_minor: i64) -> Uuid {
        let id = Uuid::new_v4();
        order::ActiveModel {
            id: Set(id),
            customer_id: Set(customer_id),
            address_id: Set(address_id),
            status: Set(order::OrderStatus::Pending),
            total_minor: Set(total_minor),
            currency: Set("INR".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed order");
        id
    }
}

/// In-process gateway double. Records created remote orders and serves them
/// back on fetch; `fail_fetch` simulates an unreachable gateway.
#[derive(Default)]
pub struct MockGateway {
    orders: Mutex<HashMap<String, RemoteOrder>>,
    counter: AtomicU64,
    pub fail_fetch: AtomicBool,
}

impl MockGateway {
    pub fn set_fetch_failure(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn remote_order(&self, remote_order_id: &str) -> Option<RemoteOrder> {
        self.orders
            .lock()
            .expect("gateway mutex poisoned")
            .get(remote_order_id)
            .cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, req: &CreateRemoteOrder) -> Result<RemoteOrder, ServiceError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let remote = RemoteOrder {
            id: format!("order_mock{:06}", n),
            amount: req.amount,
            currency: req.currency.clone(),
            notes: req.notes.clone(),
        };
        self.orders
            .lock()
            .expect("gateway mutex poisoned")
            .insert(remote.id.clone(), remote.clone());
        Ok(remote)
    }

    async fn fetch_order(&self, remote_order_id: &str) -> Result<RemoteOrder, ServiceError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ServiceError::GatewayUnavailable(
                "mock gateway offline".to_string(),
            ));
        }

        self.remote_order(remote_order_id)
            .ok_or_else(|| ServiceError::GatewayError("no such remote order".to_string()))
    }
}
