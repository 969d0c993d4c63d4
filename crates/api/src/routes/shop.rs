//! Shop endpoints: catalog browsing, purchases, and payment checks.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use catalog::{CatalogStore, NewProduct, Product, ProductPayload};
use common::{InvoiceId, Money, ProductId, UserId};
use fulfillment::{FulfillmentCoordinator, FulfillmentOutcome, NotificationSink};
use gateway::InvoiceGateway;
use ledger::{Ledger, Payment, Purchase};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<G, L, C, N>
where
    G: InvoiceGateway,
    L: Ledger,
    C: CatalogStore,
    N: NotificationSink,
{
    pub coordinator: FulfillmentCoordinator<G, L, C, N>,
    pub ledger: L,
    pub catalog: C,
}

// -- Request types --

#[derive(Deserialize)]
pub struct BeginPurchaseRequest {
    pub user_id: i64,
    pub product_id: i64,
}

#[derive(Deserialize)]
pub struct CheckPaymentRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub category_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub kind: String,
    pub content: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct PendingInvoiceResponse {
    pub invoice_id: String,
    pub pay_url: String,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct CheckPaymentResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase: Option<PurchaseResponse>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub invoice_id: String,
    pub user_id: i64,
    pub product_id: i64,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub user_id: i64,
    pub product_id: i64,
    pub price_cents: i64,
    pub purchased_at: String,
}

#[derive(Serialize)]
pub struct UserStatsResponse {
    pub user_id: i64,
    pub purchase_count: i64,
    pub total_spent_cents: i64,
}

#[derive(Serialize)]
pub struct ShopStatsResponse {
    pub purchase_count: i64,
    pub revenue_cents: i64,
}

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub kind: &'static str,
    pub active: bool,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            invoice_id: p.invoice_id.to_string(),
            user_id: p.user_id.as_i64(),
            product_id: p.product_id.as_i64(),
            amount_cents: p.amount.cents(),
            status: p.status.to_string(),
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

impl From<Purchase> for PurchaseResponse {
    fn from(p: Purchase) -> Self {
        Self {
            id: p.id.to_string(),
            user_id: p.user_id.as_i64(),
            product_id: p.product_id.as_i64(),
            price_cents: p.price.cents(),
            purchased_at: p.purchased_at.to_rfc3339(),
        }
    }
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.as_i64(),
            category_id: p.category_id,
            name: p.name,
            description: p.description,
            price_cents: p.price.cents(),
            kind: p.payload.kind().as_str(),
            active: p.active,
        }
    }
}

// -- Handlers --

/// POST /purchases — issue an invoice for a product and record the
/// pending payment.
#[tracing::instrument(skip(state, req))]
pub async fn begin_purchase<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Json(req): Json<BeginPurchaseRequest>,
) -> Result<(axum::http::StatusCode, Json<PendingInvoiceResponse>), ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let pending = state
        .coordinator
        .begin_purchase(UserId::new(req.user_id), ProductId::new(req.product_id))
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(PendingInvoiceResponse {
            invoice_id: pending.invoice_id.to_string(),
            pay_url: pending.pay_url,
            amount_cents: pending.amount.cents(),
        }),
    ))
}

/// POST /payments/:invoice_id/check — poll the processor and fulfill if
/// paid. Repeat checks of a fulfilled invoice return 200 with
/// `"already_fulfilled"` rather than an error.
#[tracing::instrument(skip(state, req))]
pub async fn check_payment<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Path(invoice_id): Path<String>,
    Json(req): Json<CheckPaymentRequest>,
) -> Result<Json<CheckPaymentResponse>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let outcome = state
        .coordinator
        .confirm_and_fulfill(&InvoiceId::new(invoice_id), UserId::new(req.user_id))
        .await?;

    let response = match outcome {
        FulfillmentOutcome::Fulfilled { purchase } => CheckPaymentResponse {
            status: "fulfilled",
            purchase: Some(purchase.into()),
        },
        FulfillmentOutcome::NotYetPaid => CheckPaymentResponse {
            status: "not_yet_paid",
            purchase: None,
        },
        FulfillmentOutcome::Expired => CheckPaymentResponse {
            status: "expired",
            purchase: None,
        },
        FulfillmentOutcome::AlreadyFulfilled => CheckPaymentResponse {
            status: "already_fulfilled",
            purchase: None,
        },
    };

    Ok(Json(response))
}

/// GET /payments/:invoice_id — look up a payment record.
#[tracing::instrument(skip(state))]
pub async fn get_payment<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let payment = state
        .ledger
        .lookup(&InvoiceId::new(invoice_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment {invoice_id} not found")))?;

    Ok(Json(payment.into()))
}

/// GET /users/:id/purchases — a user's purchase history, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_user_purchases<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PurchaseResponse>>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let purchases = state.ledger.purchases_for_user(UserId::new(id)).await?;
    Ok(Json(purchases.into_iter().map(Into::into).collect()))
}

/// GET /users/:id/stats — a user's denormalized purchase totals.
#[tracing::instrument(skip(state))]
pub async fn user_stats<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Path(id): Path<i64>,
) -> Result<Json<UserStatsResponse>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let stats = state.ledger.user_stats(UserId::new(id)).await?;
    Ok(Json(UserStatsResponse {
        user_id: stats.user_id.as_i64(),
        purchase_count: stats.purchase_count,
        total_spent_cents: stats.total_spent.cents(),
    }))
}

/// GET /stats — shop-wide sales totals.
#[tracing::instrument(skip(state))]
pub async fn shop_stats<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
) -> Result<Json<ShopStatsResponse>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let stats = state.ledger.shop_stats().await?;
    Ok(Json(ShopStatsResponse {
        purchase_count: stats.purchase_count,
        revenue_cents: stats.revenue.cents(),
    }))
}

/// GET /categories — list all categories.
#[tracing::instrument(skip(state))]
pub async fn list_categories<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let categories = state.catalog.list_categories().await?;
    Ok(Json(
        categories
            .into_iter()
            .map(|c| CategoryResponse {
                id: c.id,
                name: c.name,
            })
            .collect(),
    ))
}

/// GET /products — list active products, optionally within one category.
#[tracing::instrument(skip(state))]
pub async fn list_products<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let products = match query.category_id {
        Some(category_id) => state.catalog.list_products(category_id).await?,
        None => {
            let mut all = Vec::new();
            for category in state.catalog.list_categories().await? {
                all.extend(state.catalog.list_products(category.id).await?);
            }
            all
        }
    };

    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// POST /categories — create a category.
#[tracing::instrument(skip(state, req))]
pub async fn create_category<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(axum::http::StatusCode, Json<CategoryResponse>), ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let category = state.catalog.add_category(&req.name).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(CategoryResponse {
            id: category.id,
            name: category.name,
        }),
    ))
}

/// POST /products — add a product to the catalog.
#[tracing::instrument(skip(state, req))]
pub async fn create_product<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(axum::http::StatusCode, Json<ProductResponse>), ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    let payload = match req.kind.as_str() {
        "text" => ProductPayload::Text(req.content),
        "file" => ProductPayload::FileRef(req.content),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unknown product kind: {other:?}"
            )));
        }
    };

    let product = state
        .catalog
        .add_product(NewProduct {
            category_id: req.category_id,
            name: req.name,
            description: req.description,
            price: Money::from_cents(req.price_cents),
            payload,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(product.into())))
}

/// DELETE /products/:id — take a product off sale.
#[tracing::instrument(skip(state))]
pub async fn deactivate_product<G, L, C, N>(
    State(state): State<Arc<AppState<G, L, C, N>>>,
    Path(id): Path<i64>,
) -> Result<axum::http::StatusCode, ApiError>
where
    G: InvoiceGateway + 'static,
    L: Ledger + 'static,
    C: CatalogStore + 'static,
    N: NotificationSink + 'static,
{
    state.catalog.deactivate_product(ProductId::new(id)).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
