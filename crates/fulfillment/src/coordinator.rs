//! Coordinator for the purchase and payment-confirmation flow.

use catalog::CatalogStore;
use common::{InvoiceId, Money, ProductId, UserId};
use gateway::{InvoiceGateway, InvoiceStatus};
use ledger::{Ledger, Purchase, Settlement};

use crate::error::{FulfillmentError, Result};
use crate::sink::{NotificationSink, PurchaseAlert};

/// An invoice issued for a buyer, awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvoice {
    pub invoice_id: InvoiceId,
    pub pay_url: String,
    pub amount: Money,
}

/// Outcome of one payment-confirmation attempt.
///
/// Every variant is success-shaped: races and stale checks are normal
/// outcomes here, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// This call won the settle race; the sale is recorded and delivery
    /// was dispatched.
    Fulfilled { purchase: Purchase },
    /// The processor has not seen the payment yet. Nothing was mutated;
    /// the caller may retry later.
    NotYetPaid,
    /// The invoice lapsed on the processor side; the payment is now
    /// terminally expired and will not be fulfilled.
    Expired,
    /// A previous check already fulfilled this invoice. The caller must
    /// not re-deliver content.
    AlreadyFulfilled,
}

/// Orchestrates invoice creation and the confirm-and-fulfill state machine.
///
/// Per payment: `PENDING → PAID (terminal, fulfilled) | EXPIRED (terminal,
/// not fulfilled)`. The ledger's conditional transition is the only
/// authority for fulfillment; the gateway poll is a hint. Network calls
/// (gateway, sink) never run inside a storage transaction, so a slow
/// delivery cannot block other invoices.
pub struct FulfillmentCoordinator<G, L, C, N>
where
    G: InvoiceGateway,
    L: Ledger,
    C: CatalogStore,
    N: NotificationSink,
{
    gateway: G,
    ledger: L,
    catalog: C,
    sink: N,
}

impl<G, L, C, N> FulfillmentCoordinator<G, L, C, N>
where
    G: InvoiceGateway,
    L: Ledger,
    C: CatalogStore,
    N: NotificationSink,
{
    /// Creates a new fulfillment coordinator.
    pub fn new(gateway: G, ledger: L, catalog: C, sink: N) -> Self {
        Self {
            gateway,
            ledger,
            catalog,
            sink,
        }
    }

    /// Starts a purchase: issues a processor invoice for the product's
    /// current price and records the pending payment.
    ///
    /// The price is snapshotted into the payment here; later catalog
    /// edits do not affect this invoice.
    #[tracing::instrument(skip(self))]
    pub async fn begin_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<PendingInvoice> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .filter(|p| p.active)
            .ok_or(FulfillmentError::ProductUnavailable(product_id))?;

        let invoice = self
            .gateway
            .create_invoice(
                product.price,
                &format!("Purchase: {}", product.name),
                &format!("{user_id}:{product_id}"),
            )
            .await?;

        self.ledger
            .create_pending(user_id, product_id, invoice.invoice_id.clone(), product.price)
            .await?;

        metrics::counter!("invoices_created_total").increment(1);
        tracing::info!(%user_id, %product_id, invoice_id = %invoice.invoice_id, "invoice issued");

        Ok(PendingInvoice {
            invoice_id: invoice.invoice_id,
            pay_url: invoice.pay_url,
            amount: product.price,
        })
    }

    /// Checks an invoice with the processor and, on a confirmed payment,
    /// fulfills it exactly once.
    ///
    /// Safe to invoke any number of times, concurrently or sequentially:
    /// exactly one invocation per invoice ever observes the settle step
    /// succeed, and only that one dispatches delivery.
    #[tracing::instrument(skip(self), fields(requester = %requester))]
    pub async fn confirm_and_fulfill(
        &self,
        invoice_id: &InvoiceId,
        requester: UserId,
    ) -> Result<FulfillmentOutcome> {
        let start = std::time::Instant::now();

        let payment = self
            .ledger
            .lookup(invoice_id)
            .await?
            .ok_or_else(|| FulfillmentError::UnknownInvoice(invoice_id.clone()))?;

        // 1. Ask the processor. This is a hint only; a gateway failure
        //    here leaves every ledger row untouched and is retryable.
        let status = self.gateway.poll_status(invoice_id).await?;

        match status {
            InvoiceStatus::Pending => return Ok(FulfillmentOutcome::NotYetPaid),
            InvoiceStatus::Expired => {
                // Persist the terminal state so later checks stop polling.
                self.ledger.mark_expired_if_pending(invoice_id).await?;
                return Ok(FulfillmentOutcome::Expired);
            }
            InvoiceStatus::Paid => {}
        }

        // 2. The authoritative step: one transaction flips the status,
        //    appends the purchase row, and updates the user aggregate.
        let settlement = self.ledger.settle_if_pending(invoice_id).await?;
        let purchase = match settlement {
            Settlement::Fulfilled { purchase, .. } => purchase,
            Settlement::NotPending => {
                metrics::counter!("fulfillment_races_lost_total").increment(1);
                tracing::info!(%invoice_id, "check raced a completed fulfillment");
                return Ok(FulfillmentOutcome::AlreadyFulfilled);
            }
        };

        // 3. Dispatch delivery and the admin alert, strictly after the
        //    commit. Failures here are operational incidents for manual
        //    resend, never a reason to un-confirm the payment.
        self.dispatch_notifications(&payment.user_id, &purchase).await;

        metrics::counter!("fulfillments_total").increment(1);
        metrics::histogram!("fulfillment_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(%invoice_id, buyer = %payment.user_id, amount = %purchase.price, "payment fulfilled");

        Ok(FulfillmentOutcome::Fulfilled { purchase })
    }

    async fn dispatch_notifications(&self, buyer: &UserId, purchase: &Purchase) {
        let product = match self.catalog.get_product(purchase.product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                tracing::error!(
                    product_id = %purchase.product_id,
                    purchase_id = %purchase.id,
                    "purchased product missing from catalog; delivery needs manual resend"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    purchase_id = %purchase.id,
                    "catalog lookup failed after settlement; delivery needs manual resend"
                );
                return;
            }
        };

        if let Err(e) = self.sink.deliver(*buyer, &product.payload).await {
            tracing::warn!(
                error = %e,
                buyer = %buyer,
                purchase_id = %purchase.id,
                "content delivery failed; sale remains recorded"
            );
        }

        let alert = PurchaseAlert {
            buyer: *buyer,
            product_name: product.name,
            amount: purchase.price,
        };
        if let Err(e) = self.sink.notify_admins(&alert).await {
            tracing::warn!(error = %e, "admin alert failed");
        }
    }
}
