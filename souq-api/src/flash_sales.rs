use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souq_catalog::{CampaignStatus, FlashSaleCampaign, FlashSaleError, FlashSaleItem};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/flash-sales", post(create_flash_sale))
        .route("/api/flash-sales", get(list_flash_sales))
        .route("/api/flash-sales/{id}", put(update_flash_sale))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlashSaleItem {
    pub product_id: Uuid,
    pub flash_price_minor: i64,
    pub stock_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
}

impl CreateFlashSaleItem {
    fn into_item(self) -> FlashSaleItem {
        FlashSaleItem {
            product_id: self.product_id,
            flash_price_minor: self.flash_price_minor,
            stock_limit: self.stock_limit,
            per_user_limit: self.per_user_limit,
            sold_count: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlashSaleRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub items: Vec<CreateFlashSaleItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CampaignStatus,
    pub items: Vec<FlashSaleItem>,
}

impl FlashSaleResponse {
    fn from_campaign(campaign: FlashSaleCampaign, now: DateTime<Utc>) -> Self {
        Self {
            status: campaign.status(now),
            id: campaign.id,
            title: campaign.title,
            description: campaign.description,
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            items: campaign.items,
        }
    }
}

/// Partial update; omitted fields keep their current values. Supplying
/// `items` replaces the item list and resets its sold counters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlashSaleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub items: Option<Vec<CreateFlashSaleItem>>,
}

#[derive(Debug, Deserialize)]
pub struct ListFlashSalesQuery {
    pub status: Option<CampaignStatus>,
}

impl From<FlashSaleError> for AppError {
    fn from(err: FlashSaleError) -> Self {
        match err {
            FlashSaleError::UnknownProduct(_) => AppError::NotFoundError(err.to_string()),
            _ => AppError::ValidationError(err.to_string()),
        }
    }
}

/// Current base prices for every product a campaign references.
async fn base_prices_for(
    state: &AppState,
    campaign: &FlashSaleCampaign,
) -> Result<HashMap<Uuid, i64>, AppError> {
    let mut base_prices = HashMap::new();
    for item in &campaign.items {
        let product = state
            .catalog
            .product(item.product_id)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .ok_or(FlashSaleError::UnknownProduct(item.product_id))?;
        base_prices.insert(product.id, product.price_minor);
    }
    Ok(base_prices)
}

/// POST /api/flash-sales
/// Create a campaign. Every flash price is checked against the product's
/// current base price before anything is saved.
pub async fn create_flash_sale(
    State(state): State<AppState>,
    Json(request): Json<CreateFlashSaleRequest>,
) -> Result<(StatusCode, Json<FlashSaleResponse>), AppError> {
    let campaign = FlashSaleCampaign {
        id: Uuid::new_v4(),
        title: request.title,
        description: request.description,
        start_date: request.start_date,
        end_date: request.end_date,
        items: request
            .items
            .into_iter()
            .map(CreateFlashSaleItem::into_item)
            .collect(),
    };

    let base_prices = base_prices_for(&state, &campaign).await?;
    campaign.validate(&base_prices)?;

    state
        .catalog
        .create_campaign(&campaign)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(campaign_id = %campaign.id, title = %campaign.title, "flash sale created");

    Ok((
        StatusCode::CREATED,
        Json(FlashSaleResponse::from_campaign(campaign, Utc::now())),
    ))
}

/// PUT /api/flash-sales/:id
/// Update a campaign. The merged result is re-validated against current base
/// prices before it replaces the stored campaign.
pub async fn update_flash_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFlashSaleRequest>,
) -> Result<Json<FlashSaleResponse>, AppError> {
    let existing = state
        .catalog
        .campaign(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("flash sale not found: {id}")))?;

    let campaign = FlashSaleCampaign {
        id,
        title: request.title.unwrap_or(existing.title),
        description: request.description.or(existing.description),
        start_date: request.start_date.unwrap_or(existing.start_date),
        end_date: request.end_date.unwrap_or(existing.end_date),
        items: match request.items {
            Some(items) => items.into_iter().map(CreateFlashSaleItem::into_item).collect(),
            None => existing.items,
        },
    };

    let base_prices = base_prices_for(&state, &campaign).await?;
    campaign.validate(&base_prices)?;

    state
        .catalog
        .update_campaign(&campaign)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!(campaign_id = %campaign.id, "flash sale updated");

    Ok(Json(FlashSaleResponse::from_campaign(campaign, Utc::now())))
}

/// GET /api/flash-sales?status=active|upcoming|expired
pub async fn list_flash_sales(
    State(state): State<AppState>,
    Query(query): Query<ListFlashSalesQuery>,
) -> Result<Json<Vec<FlashSaleResponse>>, AppError> {
    let now = Utc::now();
    let campaigns = state
        .catalog
        .campaigns()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let responses: Vec<FlashSaleResponse> = campaigns
        .into_iter()
        .filter(|c| query.status.is_none_or(|wanted| c.status(now) == wanted))
        .map(|c| FlashSaleResponse::from_campaign(c, now))
        .collect();

    Ok(Json(responses))
}
