use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{InvoiceId, Money, ProductId, UserId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Ledger, LedgerError, Payment, PaymentStatus, Purchase, Result, Settlement, ShopStats,
    UserStats,
};

#[derive(Default)]
struct LedgerState {
    payments: HashMap<InvoiceId, Payment>,
    purchases: Vec<Purchase>,
    stats: HashMap<UserId, UserStats>,
}

impl LedgerState {
    /// Flips a pending payment to the given terminal status. The caller
    /// holds the write lock, which is what makes this linearizable.
    fn transition_if_pending(&mut self, invoice_id: &InvoiceId, to: PaymentStatus) -> bool {
        match self.payments.get_mut(invoice_id) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = to;
                true
            }
            _ => false,
        }
    }

    fn append_purchase(&mut self, payment: &Payment) -> Purchase {
        let purchase = Purchase {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            product_id: payment.product_id,
            price: payment.amount,
            purchased_at: Utc::now(),
        };
        self.purchases.push(purchase.clone());

        let stats = self
            .stats
            .entry(payment.user_id)
            .or_insert_with(|| UserStats::empty(payment.user_id));
        stats.purchase_count += 1;
        stats.total_spent += payment.amount;

        purchase
    }
}

/// In-memory ledger implementation for testing and local runs.
///
/// Provides the same interface and transition semantics as the PostgreSQL
/// implementation; the settle step mutates everything under one write
/// lock, mirroring the single database transaction.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of purchase rows.
    pub async fn purchase_count(&self) -> usize {
        self.state.read().await.purchases.len()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create_pending(
        &self,
        user_id: UserId,
        product_id: ProductId,
        invoice_id: InvoiceId,
        amount: Money,
    ) -> Result<Payment> {
        let mut state = self.state.write().await;

        if state.payments.contains_key(&invoice_id) {
            return Err(LedgerError::DuplicateInvoice(invoice_id));
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            invoice_id: invoice_id.clone(),
            amount,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        state.payments.insert(invoice_id, payment.clone());
        Ok(payment)
    }

    async fn mark_paid_if_pending(&self, invoice_id: &InvoiceId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.transition_if_pending(invoice_id, PaymentStatus::Paid))
    }

    async fn mark_expired_if_pending(&self, invoice_id: &InvoiceId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.transition_if_pending(invoice_id, PaymentStatus::Expired))
    }

    async fn lookup(&self, invoice_id: &InvoiceId) -> Result<Option<Payment>> {
        let state = self.state.read().await;
        Ok(state.payments.get(invoice_id).cloned())
    }

    async fn settle_if_pending(&self, invoice_id: &InvoiceId) -> Result<Settlement> {
        let mut state = self.state.write().await;

        let payment = match state.payments.get_mut(invoice_id) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = PaymentStatus::Paid;
                payment.clone()
            }
            _ => return Ok(Settlement::NotPending),
        };
        let purchase = state.append_purchase(&payment);

        metrics::counter!("payments_settled_total").increment(1);
        Ok(Settlement::Fulfilled { payment, purchase })
    }

    async fn purchases_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>> {
        let state = self.state.read().await;
        let mut purchases: Vec<_> = state
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(purchases)
    }

    async fn user_stats(&self, user_id: UserId) -> Result<UserStats> {
        let state = self.state.read().await;
        Ok(state
            .stats
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| UserStats::empty(user_id)))
    }

    async fn shop_stats(&self) -> Result<ShopStats> {
        let state = self.state.read().await;
        let revenue = state
            .purchases
            .iter()
            .fold(Money::zero(), |acc, p| acc + p.price);
        Ok(ShopStats {
            purchase_count: state.purchases.len() as i64,
            revenue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pending_payment(ledger: &InMemoryLedger, invoice: &str) -> Payment {
        ledger
            .create_pending(
                UserId::new(1),
                ProductId::new(10),
                InvoiceId::new(invoice),
                Money::from_cents(999),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_pending_and_lookup() {
        let ledger = InMemoryLedger::new();
        let payment = pending_payment(&ledger, "INV-1").await;

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, Money::from_cents(999));

        let found = ledger.lookup(&InvoiceId::new("INV-1")).await.unwrap();
        assert_eq!(found, Some(payment));
    }

    #[tokio::test]
    async fn duplicate_invoice_does_not_mutate_existing_row() {
        let ledger = InMemoryLedger::new();
        let original = pending_payment(&ledger, "INV-1").await;

        let result = ledger
            .create_pending(
                UserId::new(2),
                ProductId::new(20),
                InvoiceId::new("INV-1"),
                Money::from_cents(555),
            )
            .await;
        assert!(matches!(result, Err(LedgerError::DuplicateInvoice(_))));

        let found = ledger.lookup(&InvoiceId::new("INV-1")).await.unwrap();
        assert_eq!(found, Some(original));
    }

    #[tokio::test]
    async fn mark_paid_if_pending_is_one_shot() {
        let ledger = InMemoryLedger::new();
        pending_payment(&ledger, "INV-1").await;
        let invoice = InvoiceId::new("INV-1");

        assert!(ledger.mark_paid_if_pending(&invoice).await.unwrap());
        assert!(!ledger.mark_paid_if_pending(&invoice).await.unwrap());

        let payment = ledger.lookup(&invoice).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn mark_paid_on_unknown_invoice_returns_false() {
        let ledger = InMemoryLedger::new();
        assert!(
            !ledger
                .mark_paid_if_pending(&InvoiceId::new("INV-404"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn expired_is_terminal() {
        let ledger = InMemoryLedger::new();
        pending_payment(&ledger, "INV-1").await;
        let invoice = InvoiceId::new("INV-1");

        assert!(ledger.mark_expired_if_pending(&invoice).await.unwrap());
        // A terminal payment can no longer be paid or settled.
        assert!(!ledger.mark_paid_if_pending(&invoice).await.unwrap());
        assert_eq!(
            ledger.settle_if_pending(&invoice).await.unwrap(),
            Settlement::NotPending
        );
    }

    #[tokio::test]
    async fn settle_commits_purchase_and_aggregate_together() {
        let ledger = InMemoryLedger::new();
        pending_payment(&ledger, "INV-1").await;
        let invoice = InvoiceId::new("INV-1");

        let settlement = ledger.settle_if_pending(&invoice).await.unwrap();
        let purchase = match settlement {
            Settlement::Fulfilled { purchase, payment } => {
                assert_eq!(payment.status, PaymentStatus::Paid);
                purchase
            }
            Settlement::NotPending => panic!("expected Fulfilled"),
        };
        assert_eq!(purchase.price, Money::from_cents(999));

        let stats = ledger.user_stats(UserId::new(1)).await.unwrap();
        assert_eq!(stats.purchase_count, 1);
        assert_eq!(stats.total_spent, Money::from_cents(999));

        // Second settle is the idempotent loser path.
        assert_eq!(
            ledger.settle_if_pending(&invoice).await.unwrap(),
            Settlement::NotPending
        );
        assert_eq!(ledger.purchase_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_settles_have_exactly_one_winner() {
        let ledger = InMemoryLedger::new();
        pending_payment(&ledger, "INV-1").await;

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
        assert_eq!(ledger.purchase_count().await, 1);
        let stats = ledger.user_stats(UserId::new(1)).await.unwrap();
        assert_eq!(stats.purchase_count, 1);
    }

    #[tokio::test]
    async fn concurrent_mark_paid_has_exactly_one_winner() {
        let ledger = InMemoryLedger::new();
        pending_payment(&ledger, "INV-1").await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .mark_paid_if_pending(&InvoiceId::new("INV-1"))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn races_on_different_invoices_are_independent() {
        let ledger = InMemoryLedger::new();
        pending_payment(&ledger, "INV-1").await;
        ledger
            .create_pending(
                UserId::new(2),
                ProductId::new(11),
                InvoiceId::new("INV-2"),
                Money::from_cents(500),
            )
            .await
            .unwrap();

        assert!(matches!(
            ledger
                .settle_if_pending(&InvoiceId::new("INV-1"))
                .await
                .unwrap(),
            Settlement::Fulfilled { .. }
        ));
        assert!(matches!(
            ledger
                .settle_if_pending(&InvoiceId::new("INV-2"))
                .await
                .unwrap(),
            Settlement::Fulfilled { .. }
        ));
    }

    #[tokio::test]
    async fn aggregate_equals_sum_over_purchase_rows() {
        let ledger = InMemoryLedger::new();
        let user = UserId::new(1);

        for (i, cents) in [999, 500, 1250].into_iter().enumerate() {
            ledger
                .create_pending(
                    user,
                    ProductId::new(i as i64),
                    InvoiceId::new(format!("INV-{i}")),
                    Money::from_cents(cents),
                )
                .await
                .unwrap();
            ledger
                .settle_if_pending(&InvoiceId::new(format!("INV-{i}")))
                .await
                .unwrap();
        }

        let purchases = ledger.purchases_for_user(user).await.unwrap();
        let summed = purchases
            .iter()
            .fold(Money::zero(), |acc, p| acc + p.price);

        let stats = ledger.user_stats(user).await.unwrap();
        assert_eq!(stats.purchase_count, purchases.len() as i64);
        assert_eq!(stats.total_spent, summed);
        assert_eq!(stats.total_spent, Money::from_cents(2749));
    }

    #[tokio::test]
    async fn purchases_listed_newest_first() {
        let ledger = InMemoryLedger::new();
        let user = UserId::new(1);

        for i in 0..3 {
            ledger
                .create_pending(
                    user,
                    ProductId::new(i),
                    InvoiceId::new(format!("INV-{i}")),
                    Money::from_cents(100),
                )
                .await
                .unwrap();
            ledger
                .settle_if_pending(&InvoiceId::new(format!("INV-{i}")))
                .await
                .unwrap();
        }

        let purchases = ledger.purchases_for_user(user).await.unwrap();
        assert_eq!(purchases.len(), 3);
        assert!(purchases.windows(2).all(|w| w[0].purchased_at >= w[1].purchased_at));
    }

    #[tokio::test]
    async fn shop_stats_totals_all_users() {
        let ledger = InMemoryLedger::new();

        for (user, invoice, cents) in [(1, "INV-1", 999), (2, "INV-2", 500)] {
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

        let stats = ledger.shop_stats().await.unwrap();
        assert_eq!(stats.purchase_count, 2);
        assert_eq!(stats.revenue, Money::from_cents(1499));
    }

    #[tokio::test]
    async fn user_stats_for_unknown_user_is_empty() {
        let ledger = InMemoryLedger::new();
        let stats = ledger.user_stats(UserId::new(404)).await.unwrap();
        assert_eq!(stats, UserStats::empty(UserId::new(404)));
    }
}
