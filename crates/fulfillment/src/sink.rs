//! Notification sink trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use catalog::ProductPayload;
use common::{Money, UserId};

/// Purchase event pushed to shop administrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseAlert {
    pub buyer: UserId,
    pub product_name: String,
    pub amount: Money,
}

/// Trait for delivering purchased content and admin alerts.
///
/// Both operations are fire-and-forget: the coordinator logs failures but
/// never rolls back committed financial state because of them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends the purchased payload to the buyer.
    async fn deliver(&self, user_id: UserId, payload: &ProductPayload) -> Result<(), String>;

    /// Sends a purchase alert to the configured administrators.
    async fn notify_admins(&self, alert: &PurchaseAlert) -> Result<(), String>;
}

/// Notification sink that writes deliveries and alerts to the log.
///
/// Stands in until a messenger integration is wired up; the delivery
/// payload itself is not logged.
#[derive(Debug, Clone)]
pub struct LogSink {
    admin_ids: Vec<UserId>,
}

impl LogSink {
    /// Creates a log sink that addresses alerts to the given admins.
    pub fn new(admin_ids: Vec<UserId>) -> Self {
        Self { admin_ids }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, user_id: UserId, payload: &ProductPayload) -> Result<(), String> {
        tracing::info!(%user_id, kind = payload.kind().as_str(), "delivering purchased content");
        Ok(())
    }

    async fn notify_admins(&self, alert: &PurchaseAlert) -> Result<(), String> {
        for admin in &self.admin_ids {
            tracing::info!(
                %admin,
                buyer = %alert.buyer,
                product = %alert.product_name,
                amount = %alert.amount,
                "purchase alert"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    deliveries: Vec<(UserId, ProductPayload)>,
    alerts: Vec<PurchaseAlert>,
    fail_on_deliver: bool,
}

/// In-memory notification sink for testing.
///
/// Records every delivery and alert so tests can assert on exactly-once
/// dispatch.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingSink {
    /// Creates a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes delivery attempts fail, simulating an unreachable buyer.
    pub fn set_fail_on_deliver(&self, fail: bool) {
        self.state.write().unwrap().fail_on_deliver = fail;
    }

    /// Returns the recorded deliveries.
    pub fn deliveries(&self) -> Vec<(UserId, ProductPayload)> {
        self.state.read().unwrap().deliveries.clone()
    }

    /// Returns the recorded admin alerts.
    pub fn alerts(&self) -> Vec<PurchaseAlert> {
        self.state.read().unwrap().alerts.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, user_id: UserId, payload: &ProductPayload) -> Result<(), String> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_deliver {
            return Err("buyer unreachable".to_string());
        }
        state.deliveries.push((user_id, payload.clone()));
        Ok(())
    }

    async fn notify_admins(&self, alert: &PurchaseAlert) -> Result<(), String> {
        let mut state = self.state.write().unwrap();
        state.alerts.push(alert.clone());
        Ok(())
    }
}
