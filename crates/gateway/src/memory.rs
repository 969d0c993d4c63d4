use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{InvoiceId, Money};

use crate::{CreatedInvoice, GatewayError, InvoiceGateway, InvoiceStatus, Result};

#[derive(Debug)]
struct IssuedInvoice {
    amount: Money,
    status: InvoiceStatus,
}

#[derive(Debug, Default)]
struct GatewayState {
    invoices: HashMap<InvoiceId, IssuedInvoice>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_poll: bool,
    reject_on_create: bool,
}

/// In-memory invoice gateway for testing.
///
/// Invoices start out pending; tests drive them to paid or expired via
/// [`InMemoryGateway::set_status`], and can simulate processor outages.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a processor outage on invoice creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Simulates a processor outage on status polls.
    pub fn set_fail_on_poll(&self, fail: bool) {
        self.state.write().unwrap().fail_on_poll = fail;
    }

    /// Makes the processor logically refuse the next creation request.
    pub fn set_reject_on_create(&self, reject: bool) {
        self.state.write().unwrap().reject_on_create = reject;
    }

    /// Moves an issued invoice to the given status, as if the buyer paid
    /// or the invoice lapsed on the processor side.
    pub fn set_status(&self, invoice_id: &InvoiceId, status: InvoiceStatus) {
        let mut state = self.state.write().unwrap();
        if let Some(invoice) = state.invoices.get_mut(invoice_id) {
            invoice.status = status;
        }
    }

    /// Returns the number of invoices issued.
    pub fn invoice_count(&self) -> usize {
        self.state.read().unwrap().invoices.len()
    }

    /// Returns the amount the invoice was created for, if it exists.
    pub fn invoice_amount(&self, invoice_id: &InvoiceId) -> Option<Money> {
        self.state
            .read()
            .unwrap()
            .invoices
            .get(invoice_id)
            .map(|i| i.amount)
    }
}

#[async_trait]
impl InvoiceGateway for InMemoryGateway {
    async fn create_invoice(
        &self,
        amount: Money,
        _description: &str,
        _payload: &str,
    ) -> Result<CreatedInvoice> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }
        if state.reject_on_create {
            return Err(GatewayError::Rejected("AMOUNT_TOO_SMALL".to_string()));
        }

        state.next_id += 1;
        let invoice_id = InvoiceId::new(format!("INV-{:04}", state.next_id));
        state.invoices.insert(
            invoice_id.clone(),
            IssuedInvoice {
                amount,
                status: InvoiceStatus::Pending,
            },
        );

        Ok(CreatedInvoice {
            pay_url: format!("https://pay.test/{invoice_id}"),
            invoice_id,
        })
    }

    async fn poll_status(&self, invoice_id: &InvoiceId) -> Result<InvoiceStatus> {
        let state = self.state.read().unwrap();

        if state.fail_on_poll {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }

        state
            .invoices
            .get(invoice_id)
            .map(|i| i.status)
            .ok_or_else(|| {
                GatewayError::Unavailable(format!(
                    "invoice {invoice_id} missing from processor response"
                ))
            })
    }
}
