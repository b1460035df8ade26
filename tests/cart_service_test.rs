mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{errors::ServiceError, services::carts::AddToCartInput};
use uuid::Uuid;

#[tokio::test]
async fn cart_is_created_lazily_and_reused() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();

    let first = app.state.services.cart.get_cart(customer).await.unwrap();
    assert!(first.items.is_empty());
    assert_eq!(first.subtotal, dec!(0.00));

    let second = app.state.services.cart.get_cart(customer).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn adding_the_same_product_merges_quantities() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 10).await;

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

    let cart = app.state.services.cart.get_cart(customer).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.items[0].unit_price, dec!(100.00));
    assert_eq!(cart.subtotal, dec!(500.00));
}

#[tokio::test]
async fn merged_quantity_cannot_exceed_stock() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 5).await;

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

    let err = app
        .state
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
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(ref t) if t == "Ceramic Mug"));

    // The existing line is untouched.
    let cart = app.state.services.cart.get_cart(customer).await.unwrap();
    assert_eq!(cart.items[0].quantity, 3);
}

#[tokio::test]
async fn quantity_bounds_are_enforced() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 100).await;

    for quantity in [0, -1, 51] {
        let err = app
            .state
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
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}

#[tokio::test]
async fn adding_unknown_product_fails() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();

    let err = app
        .state
        .services
        .cart
        .add_item(
            customer,
            AddToCartInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn update_and_remove_are_scoped_to_the_owner() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 10).await;

    let item = app
        .state
        .services
        .cart
        .add_item(
            owner,
            AddToCartInput {
                product_id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .services
        .cart
        .update_item_quantity(stranger, item.id, 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = app
        .state
        .services
        .cart
        .remove_item(stranger, item.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // The owner still can.
    let updated = app
        .state
        .services
        .cart
        .update_item_quantity(owner, item.id, 4)
        .await
        .unwrap();
    assert_eq!(updated.quantity, 4);

    app.state
        .services
        .cart
        .remove_item(owner, item.id)
        .await
        .unwrap();
    let cart = app.state.services.cart.get_cart(owner).await.unwrap();
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn update_quantity_respects_stock() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let product_id = app.seed_product("Ceramic Mug", 10_000, 3).await;

    let item = app
        .state
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
        .cart
        .update_item_quantity(customer, item.id, 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
}

#[tokio::test]
async fn clear_cart_removes_every_line() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let first = app.seed_product("Ceramic Mug", 10_000, 10).await;
    let second = app.seed_product("Linen Tote", 25_000, 10).await;

    for product_id in [first, second] {
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
    }

    app.state.services.cart.clear_cart(customer).await.unwrap();
    let cart = app.state.services.cart.get_cart(customer).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal, dec!(0.00));
}
