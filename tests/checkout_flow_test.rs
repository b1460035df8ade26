mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::order::OrderStatus,
    errors::ServiceError,
    services::carts::AddToCartInput,
};
use uuid::Uuid;

#[tokio::test]
async fn placing_an_order_snapshots_prices_and_reserves_stock() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 5).await;
    let address_id = app.seed_address(customer).await;

    app.state
        .services
        .cart
        .add_item(
            customer,
            AddToCartInput {
                product_id,
                quantity: 3,
            },
        )
        .await
        .unwrap();

    let order = app
        .state
        .services
        .checkout
        .place_order(customer, address_id)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, dec!(300.00));
    assert_eq!(order.currency, "INR");
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.items[0].unit_price, dec!(100.00));
    assert_eq!(order.items[0].line_total, dec!(300.00));
    assert_eq!(
        order.address.as_ref().map(|a| a.id),
        Some(address_id)
    );

    assert_eq!(app.stock_of(product_id).await, 2);
    let cart = app.state.services.cart.get_cart(customer).await.unwrap();
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn order_total_is_the_sum_of_its_lines() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let mug = app.seed_product("Ceramic Mug", 10_000, 10).await;
    let tote = app.seed_product("Linen Tote", 25_050, 10).await;
    let address_id = app.seed_address(customer).await;

    for (product_id, quantity) in [(mug, 2), (tote, 3)] {
        app.state
            .services
            .cart
            .add_item(
                customer,
                AddToCartInput {
                    product_id,
                    quantity,
                },
            )
            .await
            .unwrap();
    }

    let order = app
        .state
        .services
        .checkout
        .place_order(customer, address_id)
        .await
        .unwrap();

    let line_sum: rust_decimal::Decimal = order.items.iter().map(|i| i.line_total).sum();
    assert_eq!(order.total, line_sum);
    assert_eq!(order.total, dec!(951.50));
}

#[tokio::test]
async fn a_paid_order_keeps_prices_from_placement_time() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 5).await;
    let address_id = app.seed_address(customer).await;

    app.state
        .services
        .cart
        .add_item(
            customer,
            AddToCartInput {
                product_id,
                quantity: 3,
            },
        )
        .await
        .unwrap();
    let order = app
        .state
        .services
        .checkout
        .place_order(customer, address_id)
        .await
        .unwrap();

    // The catalog price changes after placement.
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use storefront_api::entities::{product, Product};
    let row = Product::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut update: product::ActiveModel = row.into();
    update.price_minor = Set(99_900);
    update.update(&*app.state.db).await.unwrap();

    let fetched = app
        .state
        .services
        .orders
        .get_order(customer, order.id)
        .await
        .unwrap();
    assert_eq!(fetched.items[0].unit_price, dec!(100.00));
    assert_eq!(fetched.total, dec!(300.00));
}

#[tokio::test]
async fn checkout_requires_an_owned_address() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 5).await;
    let foreign_address = app.seed_address(stranger).await;

    app.state
        .services
        .cart
        .add_item(
            customer,
            AddToCartInput {
                product_id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .services
        .checkout
        .place_order(customer, foreign_address)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AddressNotFound));

    let err = app
        .state
        .services
        .checkout
        .place_order(customer, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AddressNotFound));
}

#[tokio::test]
async fn checkout_rejects_an_empty_cart() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let address_id = app.seed_address(customer).await;

    // No cart at all.
    let err = app
        .state
        .services
        .checkout
        .place_order(customer, address_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCart));

    // A cart that exists but holds no lines.
    app.state.services.cart.get_cart(customer).await.unwrap();
    let err = app
        .state
        .services
        .checkout
        .place_order(customer, address_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCart));
}

#[tokio::test]
async fn insufficient_stock_leaves_no_partial_state() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let plentiful = app.seed_product("Ceramic Mug", 10_000, 10).await;
    let scarce = app.seed_product("Linen Tote", 25_000, 2).await;
    let address_id = app.seed_address(customer).await;

    for (product_id, quantity) in [(plentiful, 2), (scarce, 2)] {
        app.state
            .services
            .cart
            .add_item(
                customer,
                AddToCartInput {
                    product_id,
                    quantity,
                },
            )
            .await
            .unwrap();
    }

    // Stock for the scarce product drops below the cart quantity after the
    // lines were added.
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use storefront_api::entities::{product, Product};
    let row = Product::find_by_id(scarce)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut update: product::ActiveModel = row.into();
    update.stock_qty = Set(1);
    update.update(&*app.state.db).await.unwrap();

    let err = app
        .state
        .services
        .checkout
        .place_order(customer, address_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(ref t) if t == "Linen Tote"));

    // Nothing moved: no orders, both stocks intact, cart untouched.
    assert_eq!(app.order_count().await, 0);
    assert_eq!(app.stock_of(plentiful).await, 10);
    assert_eq!(app.stock_of(scarce).await, 1);
    let cart = app.state.services.cart.get_cart(customer).await.unwrap();
    assert_eq!(cart.items.len(), 2);
}

#[tokio::test]
async fn new_default_address_unsets_the_previous_default() {
    use storefront_api::services::addresses::CreateAddressInput;

    let app = TestApp::new().await;
    let customer = Uuid::new_v4();

    let input = |name: &str| CreateAddressInput {
        full_name: name.to_string(),
        phone: "9999999999".to_string(),
        line1: "42 Test Lane".to_string(),
        line2: None,
        city: "Testville".to_string(),
        state: "Test State".to_string(),
        postal_code: "560001".to_string(),
        country: None,
        is_default: true,
    };

    let first = app
        .state
        .services
        .addresses
        .create_address(customer, input("Home"))
        .await
        .unwrap();
    assert!(first.is_default);

    let second = app
        .state
        .services
        .addresses
        .create_address(customer, input("Office"))
        .await
        .unwrap();
    assert!(second.is_default);

    let addresses = app
        .state
        .services
        .addresses
        .list_addresses(customer)
        .await
        .unwrap();
    assert_eq!(addresses.len(), 2);
    let defaults: Vec<_> = addresses.iter().filter(|a| a.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);
    // Default first in the listing.
    assert_eq!(addresses[0].id, second.id);
}

#[tokio::test]
async fn concurrent_checkouts_sharing_products_fail_only_on_stock() {
    let app = std::sync::Arc::new(TestApp::new().await);
    let mug = app.seed_product("Ceramic Mug", 10_000, 3).await;
    let tote = app.seed_product("Linen Tote", 25_000, 3).await;

    // Two customers hold the same two products, added in opposite order.
    let mut customers = Vec::new();
    for products in [[mug, tote], [tote, mug]] {
        let customer = Uuid::new_v4();
        let address_id = app.seed_address(customer).await;
        for product_id in products {
            app.state
                .services
                .cart
                .add_item(
                    customer,
                    AddToCartInput {
                        product_id,
                        quantity: 2,
                    },
                )
                .await
                .unwrap();
        }
        customers.push((customer, address_id));
    }

    let mut handles = Vec::new();
    for (customer, address_id) in customers {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.state
                .services
                .checkout
                .place_order(customer, address_id)
                .await
        }));
    }

    let mut successes = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            // Contention must surface as a stock conflict, never as an
            // infrastructure error.
            Err(err) => assert!(matches!(err, ServiceError::InsufficientStock(_))),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(app.stock_of(mug).await, 1);
    assert_eq!(app.stock_of(tote).await, 1);
    assert_eq!(app.order_count().await, 1);
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let app = std::sync::Arc::new(TestApp::new().await);
    let product_id = app.seed_product("Ceramic Mug", 10_000, 5).await;

    // Four customers each want 2 units of a 5-unit stock; at most two can win.
    let mut customers = Vec::new();
    for _ in 0..4 {
        let customer = Uuid::new_v4();
        let address_id = app.seed_address(customer).await;
        app.state
            .services
            .cart
            .add_item(
                customer,
                AddToCartInput {
                    product_id,
                    quantity: 2,
                },
            )
            .await
            .unwrap();
        customers.push((customer, address_id));
    }

    let mut handles = Vec::new();
    for (customer, address_id) in customers.clone() {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.state
                .services
                .checkout
                .place_order(customer, address_id)
                .await
        }));
    }

    let mut successes = 0usize;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, ServiceError::InsufficientStock(_))),
        }
    }

    assert!(successes <= 2, "oversold: {} checkouts succeeded", successes);
    let remaining = app.stock_of(product_id).await;
    assert_eq!(remaining, 5 - 2 * successes as i32);
    assert!(remaining >= 0);
    assert_eq!(app.order_count().await, successes);

    // Losers keep their carts; winners' carts are cleared.
    let mut intact_carts = 0usize;
    for (customer, _) in customers {
        let cart = app.state.services.cart.get_cart(customer).await.unwrap();
        if !cart.items.is_empty() {
            intact_carts += 1;
        }
    }
    assert_eq!(intact_carts, 4 - successes);
}
