#[cfg(test)]
mod tests {
    use crate::admin::ImageFile;
    use crate::app_system::Storefront;
    use crate::clients::{OrderClient, ProductClient};
    use crate::config::StorefrontConfig;
    use crate::domain::{Category, NewOrder, Order, OrderItem, OrderStatus, Product, Role};
    use crate::error::{StorefrontError, ValidationError};
    use crate::feedback::{drain, Level, Notice, UiEvent};
    use crate::mock_framework::{create_mock_client, expect_action, expect_create, expect_get};
    use crate::product_actor::{ProductAction, ProductActionResult};
    use crate::routes::{guard, Access, Route};
    use crate::session::SessionState;
    use std::time::Duration;
    use tokio::sync::watch;

    fn new_order(items: Vec<OrderItem>) -> NewOrder {
        let total = items.iter().map(OrderItem::subtotal).sum();
        NewOrder {
            event_date: "2025-08-08".into(),
            delivery_time: "12:00".into(),
            address: "Av. Siempre Viva 742".into(),
            people_count: 10,
            items,
            total,
            user_id: "uid-1".into(),
            user_email: "ana@example.com".into(),
            user_name: "Ana".into(),
            status: OrderStatus::Pending,
        }
    }

    fn item(product_id: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product_id.into(),
            name: format!("Product {product_id}"),
            price: 1000.0,
            quantity,
            image_url: String::new(),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("p1", "Empanadas", 1500.0, 10).with_category(Category::Lunch),
            Product::new("p2", "Veggie wraps", 4500.0, 5).with_category(Category::Lunch).vegetarian(true),
            Product::new("p3", "Sold out cake", 9000.0, 0).with_category(Category::Desserts),
        ]
    }

    fn notices(events: &[UiEvent]) -> Vec<&Notice> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Notice(n) => Some(n),
                UiEvent::Navigate(_) => None,
            })
            .collect()
    }

    async fn seeded_storefront() -> (Storefront, tokio::sync::mpsc::UnboundedReceiver<UiEvent>) {
        let (storefront, rx) = Storefront::in_memory(&StorefrontConfig::default());
        let backend = storefront.backend().unwrap().clone();
        backend.seed_products(catalog()).await.unwrap();
        backend.seed_account("ana@example.com", "secret1", "Ana", Role::User).await.unwrap();
        backend.seed_account("admin@example.com", "secret1", "Admin", Role::Admin).await.unwrap();
        storefront.session().init().await;
        (storefront, rx)
    }

    #[tokio::test]
    async fn test_order_creation_flow() {
        // 1. Setup mocks
        let (product_client_inner, mut product_rx) = create_mock_client::<Product>(10);
        let (order_client_inner, mut order_rx) = create_mock_client::<Order>(10);

        let product_client = ProductClient::new(product_client_inner);
        let order_client = OrderClient::new(order_client_inner, product_client);

        // 2. Execute order creation in background
        let order_task = tokio::spawn(async move { order_client.create_order(new_order(vec![item("p1", 5)])).await });

        // 3. Verify interactions
        let (product_id, responder) = expect_get(&mut product_rx).await.expect("Expected Product Get");
        assert_eq!(product_id, "p1");
        responder.send(Ok(Some(Product::new("p1", "Empanadas", 1000.0, 100)))).unwrap();

        let (product_id, action, responder) = expect_action(&mut product_rx).await.expect("Expected Product Action");
        assert_eq!(product_id, "p1");
        match action {
            ProductAction::ReserveStock(qty) => assert_eq!(qty, 5),
            _ => panic!("Unexpected action: {:?}", action),
        }
        responder.send(Ok(ProductActionResult::ReserveStock(95))).unwrap();

        let (payload, responder) = expect_create(&mut order_rx).await.expect("Expected Order Create");
        assert_eq!(payload.user_id, "uid-1");
        assert_eq!(payload.items.len(), 1);
        responder.send(Ok("order_000001".to_string())).unwrap();

        // 4. Verify result
        let result = order_task.await.unwrap();
        assert_eq!(result, Ok("order_000001".to_string()));
    }

    #[tokio::test]
    async fn test_failed_line_releases_earlier_reservations() {
        let (product_client_inner, mut product_rx) = create_mock_client::<Product>(10);
        let (order_client_inner, mut order_rx) = create_mock_client::<Order>(10);
        let order_client = OrderClient::new(order_client_inner, ProductClient::new(product_client_inner));

        let order_task = tokio::spawn(async move {
            order_client.create_order(new_order(vec![item("p1", 2), item("gone", 1)])).await
        });

        let (_, responder) = expect_get(&mut product_rx).await.unwrap();
        responder.send(Ok(Some(Product::new("p1", "Empanadas", 1000.0, 10)))).unwrap();
        let (_, _, responder) = expect_action(&mut product_rx).await.unwrap();
        responder.send(Ok(ProductActionResult::ReserveStock(8))).unwrap();

        let (product_id, responder) = expect_get(&mut product_rx).await.unwrap();
        assert_eq!(product_id, "gone");
        responder.send(Ok(None)).unwrap();

        let (product_id, action, responder) = expect_action(&mut product_rx).await.expect("Expected release");
        assert_eq!(product_id, "p1");
        assert!(matches!(action, ProductAction::ReleaseStock(2)));
        responder.send(Ok(ProductActionResult::ReleaseStock(10))).unwrap();

        let err = order_task.await.unwrap().unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert!(order_rx.try_recv().is_err(), "order must not be stored");
    }

    #[tokio::test]
    async fn customer_checkout_end_to_end() {
        let (storefront, mut rx) = seeded_storefront().await;
        assert_eq!(storefront.session().current(), SessionState::SignedOut);
        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();

        let mut catalog = storefront.catalog();
        assert_eq!(catalog.load(None).await.unwrap(), 3);
        catalog.add_to_cart("p1").await.unwrap();
        catalog.add_to_cart("p1").await.unwrap();
        let err = catalog.add_to_cart("p3").await.unwrap_err();
        assert_eq!(err, StorefrontError::Validation(ValidationError::OutOfStock("Sold out cake".into())));
        assert_eq!(storefront.badge().refresh().await, Ok(2));

        let mut cart = storefront.cart().await;
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.formatted_total(), "$3.000");

        cart.set_event_date("2025-08-08").await.unwrap();
        assert_eq!(cart.available_times().len(), 5);
        assert_eq!(cart.form.delivery_time, "10:00");
        cart.form.address = "Av. Siempre Viva 742".into();
        cart.form.people_count = "15".into();
        cart.checkout().await.unwrap();

        assert!(cart.lines().is_empty());
        assert!(cart.form.event_date.is_empty());
        let events = drain(&mut rx);
        assert!(events.contains(&UiEvent::Navigate(Route::Orders)));
        assert!(notices(&events).iter().any(|n| n.level == Level::Success && n.message == "Order placed successfully"));
        assert_eq!(storefront.badge().refresh().await, Ok(0));

        let stock = storefront.services().store.products().await.unwrap();
        assert_eq!(stock.iter().find(|p| p.id == "p1").unwrap().stock, 8);

        let mut history = storefront.order_history();
        history.load().await.unwrap();
        let summaries = history.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, "Pending");
        assert_eq!(summaries[0].event_date, "08-08-2025");
        assert_eq!(summaries[0].total, "$3.000");

        // The booked slot is no longer offered.
        let mut next = storefront.cart().await;
        next.set_event_date("2025-08-08").await.unwrap();
        assert!(!next.available_times().contains(&"10:00".to_string()));

        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn checkout_validation_sends_nothing() {
        let (storefront, mut rx) = seeded_storefront().await;
        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();
        storefront.catalog().add_to_cart("p2").await.unwrap();

        let mut cart = storefront.cart().await;
        cart.set_event_date("2025-08-08").await.unwrap();
        cart.form.people_count = "3".into();
        drain(&mut rx);

        let err = cart.checkout().await.unwrap_err();
        assert_eq!(err, StorefrontError::Validation(ValidationError::MissingAddress));
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![UiEvent::Notice(Notice { level: Level::Error, message: "Please enter the delivery address.".into() })]
        );
        assert_eq!(cart.lines().len(), 1);
        assert!(storefront.services().store.orders().await.unwrap().is_empty());

        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn zero_quantity_removes_the_line() {
        let (storefront, _rx) = seeded_storefront().await;
        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();
        let catalog = storefront.catalog();
        catalog.add_to_cart("p1").await.unwrap();
        catalog.add_to_cart("p2").await.unwrap();

        let mut cart = storefront.cart().await;
        let first = cart.lines()[0].id.clone();
        let second = cart.lines()[1].id.clone();
        cart.update_quantity(&second, 3).await.unwrap();
        assert_eq!(cart.item_count(), 4);

        cart.update_quantity(&first, 0).await.unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total(), 4500.0 * 3.0);

        let reloaded = storefront.cart().await;
        assert_eq!(reloaded.lines(), cart.lines());
        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn admin_manages_order_status_and_dates() {
        let (storefront, _rx) = seeded_storefront().await;
        let backend = storefront.backend().unwrap().clone();
        let orders: Vec<Order> = serde_json::from_str(
            r#"[
                {"id":"o1","userId":"uid-1","eventDate":"2025-08-08T00:00:00","status":"Pending","createdAt":"2025-07-01T10:00:00Z"},
                {"id":"o2","userId":"uid-1","eventDate":"2025-08-09","status":"Confirmed","createdAt":"2025-07-02T10:00:00Z"}
            ]"#,
        )
        .unwrap();
        for order in orders {
            backend.seed_order(order).await.unwrap();
        }

        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();
        let mut forbidden = storefront.admin_orders();
        assert_eq!(
            forbidden.load().await,
            Err(StorefrontError::Validation(ValidationError::AdminOnly))
        );
        assert!(forbidden.last_error().is_some());
        storefront.session().sign_out().await.unwrap();

        storefront.session().sign_in("admin@example.com", "secret1").await.unwrap();
        let mut admin = storefront.admin_orders();
        admin.load().await.unwrap();
        let ids: Vec<&str> = admin.orders().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["o2", "o1"]);

        admin.filter_by_date("2025-08-08");
        assert_eq!(admin.visible().len(), 1);
        assert_eq!(admin.visible()[0].id, "o1");
        admin.filter_by_date("2025-08-10");
        assert!(admin.visible().is_empty());
        admin.show_all();
        assert_eq!(admin.visible().len(), 2);

        // Any status may follow any other.
        admin.set_status("o2", OrderStatus::Pending).await.unwrap();
        admin.set_status("o1", OrderStatus::Delivered).await.unwrap();
        let stored = storefront.services().store.orders().await.unwrap();
        assert_eq!(stored.iter().find(|o| o.id == "o1").unwrap().status, Some(OrderStatus::Delivered));
        assert_eq!(stored.iter().find(|o| o.id == "o2").unwrap().status, Some(OrderStatus::Pending));

        let err = admin.set_status("missing", OrderStatus::Shipped).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Api(ref e) if e.status_code() == Some(404)));
        assert!(admin.last_error().unwrap().contains("Could not update the order status"));

        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn admin_product_editor_round_trip() {
        let (storefront, mut rx) = seeded_storefront().await;
        storefront.session().sign_in("admin@example.com", "secret1").await.unwrap();

        let mut editor = storefront.product_editor();
        editor.load().await.unwrap();
        assert_eq!(editor.products().len(), 3);

        editor.form.name = "Coffee break".into();
        editor.form.price = "8900".into();
        editor.form.stock = "12".into();
        editor.form.category = Category::Beverages;
        editor.image = Some(ImageFile::new("image/png", vec![1, 2, 3]));
        editor.save().await.unwrap();

        assert_eq!(editor.products().len(), 4);
        assert!(editor.editing().is_none());
        let created = editor.products().iter().find(|p| p.name == "Coffee break").unwrap().clone();
        assert!(created.image_url.starts_with("https://storage.googleapis.com/catering-app-ls.appspot.com/products/"));
        assert_eq!(created.stock, 12);

        assert!(editor.edit(&created.id));
        editor.form.price = "9500".into();
        editor.save().await.unwrap();
        let updated = editor.products().iter().find(|p| p.id == created.id).unwrap();
        assert_eq!(updated.price, 9500.0);
        assert_eq!(updated.image_url, created.image_url);

        drain(&mut rx);
        assert_eq!(
            editor.confirm_delete().await,
            Err(StorefrontError::Validation(ValidationError::NothingToDelete))
        );
        editor.request_delete(&created.id);
        editor.cancel_delete();
        assert!(editor.pending_delete().is_none());
        assert_eq!(editor.products().len(), 4);

        editor.request_delete(&created.id);
        editor.confirm_delete().await.unwrap();
        assert_eq!(editor.products().len(), 3);
        assert!(notices(&drain(&mut rx)).iter().any(|n| n.message == "Product deleted"));

        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn customers_cannot_write_products() {
        let (storefront, mut rx) = seeded_storefront().await;
        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();
        let mut editor = storefront.product_editor();
        editor.form.name = "Sneaky".into();

        let err = editor.save().await.unwrap_err();
        assert!(err.requires_login());
        assert!(drain(&mut rx).contains(&UiEvent::Navigate(Route::Login)));
        assert_eq!(storefront.services().store.products().await.unwrap().len(), 3);
        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn image_repair_rewrites_only_broken_references() {
        let (storefront, _rx) = seeded_storefront().await;
        let backend = storefront.backend().unwrap().clone();
        backend
            .seed_products(vec![
                Product::new("p1", "Empanadas", 1500.0, 10).with_image("1712_tray.jpg"),
                Product::new("p2", "Wraps", 4500.0, 5).with_image("https://cdn.example.com/wraps.png"),
                Product::new("p3", "Cake", 9000.0, 1).with_image("https://via.placeholder.com/150"),
            ])
            .await
            .unwrap();
        let order: Order = serde_json::from_str(
            r#"{"id":"o1","items":[{"productId":"p1","name":"Empanadas","imageUrl":"400x300"},{"productId":"p2","imageUrl":"https://cdn.example.com/wraps.png"}]}"#,
        )
        .unwrap();
        backend.seed_order(order).await.unwrap();

        let repair = storefront.image_repair();
        let preview = repair.run(true).await.unwrap();
        assert_eq!(preview.products.len(), 2);
        assert_eq!(preview.orders, ["o1"]);
        let untouched = storefront.services().store.products().await.unwrap();
        assert_eq!(untouched[0].image_url, "1712_tray.jpg");

        let report = repair.run(false).await.unwrap();
        assert_eq!(report.changed(), 3);
        let products = storefront.services().store.products().await.unwrap();
        assert_eq!(
            products[0].image_url,
            "https://storage.googleapis.com/catering-app-ls.appspot.com/products/1712_tray.jpg"
        );
        assert_eq!(products[2].image_url, storefront.services().product_placeholder);
        assert_eq!(repair.run(true).await.unwrap().changed(), 0);

        storefront.shutdown().await.unwrap();
    }

    async fn badge_shows(badge: &mut watch::Receiver<u32>, expected: u32) {
        let shown = tokio::time::timeout(Duration::from_secs(2), badge.wait_for(|count| *count == expected)).await;
        assert!(matches!(shown, Ok(Ok(_))), "badge never showed {expected}");
    }

    #[tokio::test]
    async fn badge_follows_cart_events_and_session_changes() {
        let (storefront, _rx) = seeded_storefront().await;
        let mut badge = storefront.badge().subscribe();
        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();

        let catalog = storefront.catalog();
        catalog.add_to_cart("p1").await.unwrap();
        badge_shows(&mut badge, 1).await;
        catalog.add_to_cart("p2").await.unwrap();
        badge_shows(&mut badge, 2).await;

        storefront.session().sign_out().await.unwrap();
        badge_shows(&mut badge, 0).await;

        // The server kept the cart, so signing back in restores the count.
        storefront.session().sign_in("ana@example.com", "secret1").await.unwrap();
        badge_shows(&mut badge, 2).await;
        assert_eq!(storefront.badge().count(), 2);

        storefront.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn sessions_drive_routes_and_history_redirects() {
        let (storefront, mut rx) = seeded_storefront().await;
        let session = storefront.session();
        assert_eq!(guard(Route::Cart, &session.current()), Access::Redirect(Route::Login));

        let mut history = storefront.order_history();
        assert!(history.load().await.is_err());
        assert!(drain(&mut rx).contains(&UiEvent::Navigate(Route::Login)));

        let user = session.sign_up("new@example.com", "secret1", "Nueva").await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.order_name(), "Nueva");
        let profile = storefront.services().store.user_profile(&user.uid).await.unwrap().unwrap();
        assert_eq!(profile.role, Role::User);
        assert_eq!(guard(Route::Admin, &session.current()), Access::Redirect(Route::Home));
        session.sign_out().await.unwrap();

        session.sign_in("admin@example.com", "secret1").await.unwrap();
        assert_eq!(guard(Route::Admin, &session.current()), Access::Granted);
        history.load().await.unwrap();
        assert!(drain(&mut rx).contains(&UiEvent::Navigate(Route::Admin)));
        assert_eq!(storefront.badge().refresh().await, Ok(0));

        storefront.shutdown().await.unwrap();
    }
}
