use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{InvoiceId, Money, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Ledger, LedgerError, Payment, PaymentStatus, Purchase, Result, Settlement, ShopStats,
    UserStats,
};

/// PostgreSQL-backed ledger implementation.
///
/// The pending→paid transition is a conditional `UPDATE`, so it stays
/// correct across multiple process instances sharing the database; no
/// in-process locking is involved.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status_str: String = row.try_get("status")?;
        let status = PaymentStatus::parse(&status_str).ok_or_else(|| {
            LedgerError::Database(sqlx::Error::Decode(
                format!("unknown payment status {status_str:?}").into(),
            ))
        })?;

        Ok(Payment {
            id: row.try_get::<Uuid, _>("id")?,
            user_id: UserId::new(row.try_get("user_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            invoice_id: InvoiceId::new(row.try_get::<String, _>("invoice_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_purchase(row: PgRow) -> Result<Purchase> {
        Ok(Purchase {
            id: row.try_get::<Uuid, _>("id")?,
            user_id: UserId::new(row.try_get("user_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            price: Money::from_cents(row.try_get("price_cents")?),
            purchased_at: row.try_get::<DateTime<Utc>, _>("purchased_at")?,
        })
    }
}

#[async_trait]
impl Ledger for PostgresLedger {
    async fn create_pending(
        &self,
        user_id: UserId,
        product_id: ProductId,
        invoice_id: InvoiceId,
        amount: Money,
    ) -> Result<Payment> {
        let row = sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, product_id, invoice_id, amount_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING id, user_id, product_id, invoice_id, amount_cents, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .bind(invoice_id.as_str())
        .bind(amount.cents())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("payments_invoice_id_key")
            {
                return LedgerError::DuplicateInvoice(invoice_id.clone());
            }
            LedgerError::Database(e)
        })?;

        Self::row_to_payment(row)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_paid_if_pending(&self, invoice_id: &InvoiceId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'paid' WHERE invoice_id = $1 AND status = 'pending'",
        )
        .bind(invoice_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn mark_expired_if_pending(&self, invoice_id: &InvoiceId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'expired' WHERE invoice_id = $1 AND status = 'pending'",
        )
        .bind(invoice_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn lookup(&self, invoice_id: &InvoiceId) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, product_id, invoice_id, amount_cents, status, created_at
            FROM payments
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn settle_if_pending(&self, invoice_id: &InvoiceId) -> Result<Settlement> {
        let mut tx = self.pool.begin().await?;

        // The conditional update is the race arbiter: concurrent settles
        // on one invoice id serialize on this row and exactly one sees
        // a pending status.
        let row = sqlx::query(
            r#"
            UPDATE payments SET status = 'paid'
            WHERE invoice_id = $1 AND status = 'pending'
            RETURNING id, user_id, product_id, invoice_id, amount_cents, status, created_at
            "#,
        )
        .bind(invoice_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(Settlement::NotPending);
        };
        let payment = Self::row_to_payment(row)?;

        let purchase_row = sqlx::query(
            r#"
            INSERT INTO purchases (id, user_id, product_id, price_cents, purchased_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, product_id, price_cents, purchased_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.user_id.as_i64())
        .bind(payment.product_id.as_i64())
        .bind(payment.amount.cents())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        let purchase = Self::row_to_purchase(purchase_row)?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, total_purchases, total_spent_cents)
            VALUES ($1, 1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                total_purchases = users.total_purchases + 1,
                total_spent_cents = users.total_spent_cents + EXCLUDED.total_spent_cents
            "#,
        )
        .bind(payment.user_id.as_i64())
        .bind(payment.amount.cents())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("payments_settled_total").increment(1);
        Ok(Settlement::Fulfilled { payment, purchase })
    }

    async fn purchases_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, price_cents, purchased_at
            FROM purchases
            WHERE user_id = $1
            ORDER BY purchased_at DESC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_purchase).collect()
    }

    async fn user_stats(&self, user_id: UserId) -> Result<UserStats> {
        let row = sqlx::query(
            "SELECT total_purchases, total_spent_cents FROM users WHERE user_id = $1",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(UserStats {
                user_id,
                purchase_count: row.try_get("total_purchases")?,
                total_spent: Money::from_cents(row.try_get("total_spent_cents")?),
            }),
            None => Ok(UserStats::empty(user_id)),
        }
    }

    async fn shop_stats(&self) -> Result<ShopStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS purchase_count, COALESCE(SUM(price_cents), 0)::BIGINT AS revenue_cents FROM purchases",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ShopStats {
            purchase_count: row.try_get("purchase_count")?,
            revenue: Money::from_cents(row.try_get::<i64, _>("revenue_cents")?),
        })
    }
}
