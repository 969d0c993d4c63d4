//! HTTP client for the Crypto Pay-style invoice processor.

use std::time::Duration;

use async_trait::async_trait;
use common::{InvoiceId, Money};
use serde::Deserialize;

use crate::{CreatedInvoice, GatewayError, InvoiceGateway, InvoiceStatus, Result};

const API_TOKEN_HEADER: &str = "Crypto-Pay-API-Token";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// All invoices settle in one fixed asset; currency conversion is out of
/// scope.
const SETTLEMENT_ASSET: &str = "USDT";

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceBody {
    invoice_id: serde_json::Number,
    #[serde(default)]
    pay_url: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceListBody {
    items: Vec<InvoiceBody>,
}

/// Client for the Crypto Pay HTTP API.
pub struct CryptoPayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl CryptoPayClient {
    /// Creates a client against the given API base URL with a bounded
    /// request timeout.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn parse_status(raw: &str) -> Result<InvoiceStatus> {
        match raw {
            "paid" => Ok(InvoiceStatus::Paid),
            // The processor calls open invoices "active".
            "active" | "pending" => Ok(InvoiceStatus::Pending),
            "expired" => Ok(InvoiceStatus::Expired),
            other => Err(GatewayError::Unavailable(format!(
                "unknown invoice status {other:?}"
            ))),
        }
    }

    fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T> {
        if envelope.ok {
            envelope.result.ok_or_else(|| {
                GatewayError::Unavailable("processor response missing result".to_string())
            })
        } else {
            let detail = envelope
                .error
                .map(|e| format!("{} (code {})", e.name, e.code))
                .unwrap_or_else(|| "unspecified error".to_string());
            Err(GatewayError::Rejected(detail))
        }
    }
}

#[async_trait]
impl InvoiceGateway for CryptoPayClient {
    #[tracing::instrument(skip(self, payload), fields(amount = %amount.to_decimal_string()))]
    async fn create_invoice(
        &self,
        amount: Money,
        description: &str,
        payload: &str,
    ) -> Result<CreatedInvoice> {
        let url = format!("{}/createInvoice", self.base_url);
        let body = serde_json::json!({
            "asset": SETTLEMENT_ASSET,
            "amount": amount.to_decimal_string(),
            "description": description,
            "payload": payload,
        });

        let response = self
            .http
            .post(&url)
            .header(API_TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "createInvoice returned HTTP {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<InvoiceBody> = response.json().await?;
        let invoice = Self::unwrap_envelope(envelope)?;

        Ok(CreatedInvoice {
            invoice_id: InvoiceId::new(invoice.invoice_id.to_string()),
            pay_url: invoice.pay_url,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn poll_status(&self, invoice_id: &InvoiceId) -> Result<InvoiceStatus> {
        let url = format!("{}/getInvoices", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(API_TOKEN_HEADER, &self.token)
            .query(&[("invoice_ids", invoice_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "getInvoices returned HTTP {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<InvoiceListBody> = response.json().await?;
        let list = Self::unwrap_envelope(envelope)?;

        // We only ever poll invoices we created, so an empty answer means
        // the processor has not caught up yet; treat it as retryable.
        let invoice = list.items.first().ok_or_else(|| {
            GatewayError::Unavailable(format!("invoice {invoice_id} missing from processor response"))
        })?;

        Self::parse_status(&invoice.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_maps_processor_vocabulary() {
        assert_eq!(
            CryptoPayClient::parse_status("paid").unwrap(),
            InvoiceStatus::Paid
        );
        assert_eq!(
            CryptoPayClient::parse_status("active").unwrap(),
            InvoiceStatus::Pending
        );
        assert_eq!(
            CryptoPayClient::parse_status("expired").unwrap(),
            InvoiceStatus::Expired
        );
        assert!(matches!(
            CryptoPayClient::parse_status("refunded"),
            Err(GatewayError::Unavailable(_))
        ));
    }

    #[test]
    fn envelope_rejection_is_non_retryable() {
        let envelope: ApiEnvelope<InvoiceBody> = serde_json::from_str(
            r#"{"ok": false, "error": {"code": 400, "name": "AMOUNT_TOO_SMALL"}}"#,
        )
        .unwrap();

        let result = CryptoPayClient::unwrap_envelope(envelope);
        match result {
            Err(GatewayError::Rejected(msg)) => assert!(msg.contains("AMOUNT_TOO_SMALL")),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn envelope_missing_result_is_retryable() {
        let envelope: ApiEnvelope<InvoiceBody> = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(matches!(
            CryptoPayClient::unwrap_envelope(envelope),
            Err(GatewayError::Unavailable(_))
        ));
    }

    #[test]
    fn create_body_formats_amount_as_decimal_string() {
        // The wire amount must never use floating point formatting.
        assert_eq!(Money::from_cents(999).to_decimal_string(), "9.99");
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = CryptoPayClient::new("https://pay.example/api/", "token").unwrap();
        assert_eq!(client.base_url, "https://pay.example/api");
    }
}
