//! Integration tests for the catalog, cart and order services.
//!
//! These tests run the services together over both the in-memory and the
//! JSON-file record stores.

use common::{Money, SessionId};
use domain::{
    CartService, CatalogService, DomainError, InventoryLedger, OrderService, OrderStatus,
    ProductFilter,
};
use record_store::{
    Collection, InMemoryRecordStore, JsonFileRecordStore, OperationKind, RecordId, RecordStore,
    Records,
};

struct Shop<S> {
    records: Records<S>,
    catalog: CatalogService<S>,
    cart: CartService<S>,
    ledger: InventoryLedger<S>,
    orders: OrderService<S>,
}

impl<S: RecordStore> Shop<S> {
    async fn seeded(store: S) -> Self {
        let records = Records::new(store);
        let shop = Self {
            catalog: CatalogService::new(records.clone()),
            cart: CartService::new(records.clone()),
            ledger: InventoryLedger::new(records.clone()),
            orders: OrderService::new(records.clone()),
            records,
        };
        shop.catalog.seed_defaults().await.unwrap();
        shop
    }
}

fn whey() -> RecordId {
    RecordId::new(1)
}

fn creatine() -> RecordId {
    RecordId::new(6)
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn seeded_catalog_is_browsable() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;

        let all = shop.catalog.products(&ProductFilter::default()).await.unwrap();
        assert_eq!(all.len(), 12);

        let creatine = shop.catalog.product(creatine()).await.unwrap();
        assert_eq!(creatine.name, "Creatine Monohydrate 500g");
        assert_eq!(creatine.price, Money::new(150_000));
        assert_eq!(creatine.emoji.as_deref(), Some("⚡"));

        let bars = shop
            .catalog
            .products(&ProductFilter {
                max_price: Some(Money::new(20_000)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[tokio::test]
    async fn seeding_writes_insert_log_entries() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;

        let logs = shop.records.recent_logs(100).await.unwrap();
        assert_eq!(logs.len(), 20);
        assert!(logs.iter().all(|e| e.operation == OperationKind::Insert));
    }
}

mod cart_and_inventory {
    use super::*;

    #[tokio::test]
    async fn cart_respects_live_stock() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;
        let session = SessionId::new("s-1");

        shop.ledger.set_stock(whey(), 2).await.unwrap();
        shop.cart.add(&session, whey(), 2).await.unwrap();

        let result = shop.cart.add(&session, whey(), 1).await;
        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));

        shop.ledger.reserve(whey(), 1).await.unwrap();
        let unavailable = shop.cart.unavailable_lines(&session).await.unwrap();
        assert_eq!(unavailable.len(), 1);
        assert_eq!(unavailable[0].available, 1);
    }

    #[tokio::test]
    async fn low_stock_report_after_sales() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;
        shop.ledger.reserve(RecordId::new(3), 20).await.unwrap();

        let low = shop.ledger.low_stock(domain::LOW_STOCK_THRESHOLD).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].stock_quantity, 5);
    }
}

mod orders {
    use super::*;
    use domain::{CustomerDetails, Order, OrderItem};

    async fn manual_order<S: RecordStore>(shop: &Shop<S>, quantity: u32) -> RecordId {
        let order = shop
            .records
            .insert(Order::pending(
                CustomerDetails::new("Nodira").validated().unwrap(),
                Money::new(150_000).multiply(quantity),
            ))
            .await
            .unwrap();
        let order_id = order.id.unwrap();
        shop.records
            .insert(OrderItem::new(
                order_id,
                creatine(),
                "Creatine Monohydrate 500g",
                quantity,
                Money::new(150_000),
            ))
            .await
            .unwrap();
        shop.ledger.reserve(creatine(), quantity).await.unwrap();
        order_id
    }

    #[tokio::test]
    async fn order_lifecycle_to_delivery() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;
        let order_id = manual_order(&shop, 2).await;

        shop.orders
            .update_status(order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        shop.orders
            .update_status(order_id, OrderStatus::Shipped)
            .await
            .unwrap();
        let delivered = shop
            .orders
            .update_status(order_id, OrderStatus::Delivered)
            .await
            .unwrap();

        assert!(delivered.status.is_terminal());
        assert_eq!(shop.ledger.stock(creatine()).await.unwrap(), 78);
    }

    #[tokio::test]
    async fn deleting_order_returns_stock() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;
        let order_id = manual_order(&shop, 5).await;
        assert_eq!(shop.ledger.stock(creatine()).await.unwrap(), 75);

        shop.orders.delete(order_id).await.unwrap();
        assert_eq!(shop.ledger.stock(creatine()).await.unwrap(), 80);
    }

    #[tokio::test]
    async fn product_in_an_order_cannot_be_deleted() {
        let shop = Shop::seeded(InMemoryRecordStore::new()).await;
        manual_order(&shop, 1).await;

        let result = shop.catalog.delete_product(creatine()).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }
}

mod json_file_backend {
    use super::*;

    #[tokio::test]
    async fn state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let session = SessionId::new("persistent");

        {
            let store = JsonFileRecordStore::open(tmp.path()).await.unwrap();
            let shop = Shop::seeded(store).await;
            shop.cart.add(&session, whey(), 3).await.unwrap();
        }

        let store = JsonFileRecordStore::open(tmp.path()).await.unwrap();
        assert!(tmp.path().join("cart_items.json").is_file());
        let shop = Shop::seeded(store).await;

        let snapshot = shop.cart.snapshot(&session).await.unwrap();
        assert_eq!(snapshot.total_quantity, 3);
        assert_eq!(snapshot.total_amount, Money::new(1_350_000));
        assert_eq!(
            shop.records.store().load(Collection::Categories).await.unwrap().len(),
            8
        );
    }
}
