//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p ledger --test postgres_integration
//! ```

use std::sync::Arc;

use common::{InvoiceId, Money, ProductId, UserId};
use ledger::{Ledger, LedgerError, PaymentStatus, PostgresLedger, Settlement};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/002_create_ledger_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh ledger with its own pool and cleared tables
async fn get_test_ledger() -> PostgresLedger {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE payments, purchases, users")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLedger::new(pool)
}

async fn pending_payment(ledger: &PostgresLedger, invoice: &str, cents: i64) {
    ledger
        .create_pending(
            UserId::new(1),
            ProductId::new(10),
            InvoiceId::new(invoice),
            Money::from_cents(cents),
        )
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn create_pending_and_lookup() {
    let ledger = get_test_ledger().await;
    pending_payment(&ledger, "INV-1", 999).await;

    let payment = ledger
        .lookup(&InvoiceId::new("INV-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Money::from_cents(999));
    assert_eq!(payment.user_id, UserId::new(1));
}

#[tokio::test]
#[serial]
async fn duplicate_invoice_rejected_without_mutation() {
    let ledger = get_test_ledger().await;
    pending_payment(&ledger, "INV-1", 999).await;

    let result = ledger
        .create_pending(
            UserId::new(2),
            ProductId::new(20),
            InvoiceId::new("INV-1"),
            Money::from_cents(555),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::DuplicateInvoice(_))));

    let payment = ledger
        .lookup(&InvoiceId::new("INV-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.user_id, UserId::new(1));
    assert_eq!(payment.amount, Money::from_cents(999));
}

#[tokio::test]
#[serial]
async fn mark_paid_if_pending_is_one_shot() {
    let ledger = get_test_ledger().await;
    pending_payment(&ledger, "INV-1", 999).await;
    let invoice = InvoiceId::new("INV-1");

    assert!(ledger.mark_paid_if_pending(&invoice).await.unwrap());
    assert!(!ledger.mark_paid_if_pending(&invoice).await.unwrap());
    assert!(
        !ledger
            .mark_paid_if_pending(&InvoiceId::new("INV-404"))
            .await
            .unwrap()
    );
}

#[tokio::test]
#[serial]
async fn expired_blocks_settlement() {
    let ledger = get_test_ledger().await;
    pending_payment(&ledger, "INV-1", 999).await;
    let invoice = InvoiceId::new("INV-1");

    assert!(ledger.mark_expired_if_pending(&invoice).await.unwrap());
    assert_eq!(
        ledger.settle_if_pending(&invoice).await.unwrap(),
        Settlement::NotPending
    );

    let payment = ledger.lookup(&invoice).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Expired);
}

#[tokio::test]
#[serial]
async fn settle_commits_purchase_and_aggregate_atomically() {
    let ledger = get_test_ledger().await;
    pending_payment(&ledger, "INV-1", 999).await;
    let invoice = InvoiceId::new("INV-1");

    let settlement = ledger.settle_if_pending(&invoice).await.unwrap();
    match settlement {
        Settlement::Fulfilled { payment, purchase } => {
            assert_eq!(payment.status, PaymentStatus::Paid);
            assert_eq!(purchase.price, Money::from_cents(999));
        }
        Settlement::NotPending => panic!("expected Fulfilled"),
    }

    let stats = ledger.user_stats(UserId::new(1)).await.unwrap();
    assert_eq!(stats.purchase_count, 1);
    assert_eq!(stats.total_spent, Money::from_cents(999));

    let purchases = ledger.purchases_for_user(UserId::new(1)).await.unwrap();
    assert_eq!(purchases.len(), 1);

    // Re-settling is the idempotent loser path.
    assert_eq!(
        ledger.settle_if_pending(&invoice).await.unwrap(),
        Settlement::NotPending
    );
    let purchases = ledger.purchases_for_user(UserId::new(1)).await.unwrap();
    assert_eq!(purchases.len(), 1);
}

#[tokio::test]
#[serial]
async fn concurrent_settles_have_exactly_one_winner() {
    let ledger = get_test_ledger().await;
    pending_payment(&ledger, "INV-1", 999).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .settle_if_pending(&InvoiceId::new("INV-1"))
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), Settlement::Fulfilled { .. }) {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    let purchases = ledger.purchases_for_user(UserId::new(1)).await.unwrap();
    assert_eq!(purchases.len(), 1);
    let stats = ledger.user_stats(UserId::new(1)).await.unwrap();
    assert_eq!(stats.purchase_count, 1);
    assert_eq!(stats.total_spent, Money::from_cents(999));
}

#[tokio::test]
#[serial]
async fn aggregate_matches_purchase_rows_across_users() {
    let ledger = get_test_ledger().await;

    for (user, invoice, cents) in [
        (1, "INV-1", 999),
        (1, "INV-2", 500),
        (2, "INV-3", 1250),
    ] {
        ledger
            .create_pending(
                UserId::new(user),
                ProductId::new(1),
                InvoiceId::new(invoice),
                Money::from_cents(cents),
            )
            .await
            .unwrap();
        ledger
            .settle_if_pending(&InvoiceId::new(invoice))
            .await
            .unwrap();
    }

    let stats1 = ledger.user_stats(UserId::new(1)).await.unwrap();
    assert_eq!(stats1.purchase_count, 2);
    assert_eq!(stats1.total_spent, Money::from_cents(1499));

    let stats2 = ledger.user_stats(UserId::new(2)).await.unwrap();
    assert_eq!(stats2.purchase_count, 1);
    assert_eq!(stats2.total_spent, Money::from_cents(1250));

    let shop = ledger.shop_stats().await.unwrap();
    assert_eq!(shop.purchase_count, 3);
    assert_eq!(shop.revenue, Money::from_cents(2749));
}

#[tokio::test]
#[serial]
async fn purchases_listed_newest_first() {
    let ledger = get_test_ledger().await;

    for (invoice, cents) in [("INV-1", 100), ("INV-2", 200), ("INV-3", 300)] {
        pending_payment(&ledger, invoice, cents).await;
        ledger
            .settle_if_pending(&InvoiceId::new(invoice))
            .await
            .unwrap();
    }

    let purchases = ledger.purchases_for_user(UserId::new(1)).await.unwrap();
    assert_eq!(purchases.len(), 3);
    assert!(
        purchases
            .windows(2)
            .all(|w| w[0].purchased_at >= w[1].purchased_at)
    );
}
