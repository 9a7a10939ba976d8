use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived campaign status; never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Upcoming,
    Active,
    Expired,
}

/// One product's promotional terms within a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleItem {
    pub product_id: Uuid,
    /// Promotional unit price, minor units, base currency. Must be strictly
    /// below the product's base price (checked when the campaign is saved).
    pub flash_price_minor: i64,
    /// Total units the campaign will sell for this product.
    pub stock_limit: Option<i32>,
    /// Units a single customer may buy of this product within the campaign.
    pub per_user_limit: Option<i32>,
    /// Units sold so far; monotonically increasing, bumped at order commit.
    #[serde(default)]
    pub sold_count: i32,
}

impl FlashSaleItem {
    pub fn remaining(&self) -> Option<i32> {
        self.stock_limit.map(|limit| (limit - self.sold_count).max(0))
    }
}

/// Time-bound promotional campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleCampaign {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub items: Vec<FlashSaleItem>,
}

impl FlashSaleCampaign {
    /// Status as a pure function of the clock and the campaign window.
    pub fn status(&self, now: DateTime<Utc>) -> CampaignStatus {
        if now < self.start_date {
            CampaignStatus::Upcoming
        } else if now > self.end_date {
            CampaignStatus::Expired
        } else {
            CampaignStatus::Active
        }
    }

    pub fn item_for(&self, product_id: Uuid) -> Option<&FlashSaleItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Configuration-time validation, run when a campaign is created or
    /// updated. `base_prices` maps product id to its base price in minor
    /// units. Order placement assumes campaigns already passed this.
    pub fn validate(&self, base_prices: &HashMap<Uuid, i64>) -> Result<(), FlashSaleError> {
        if self.end_date <= self.start_date {
            return Err(FlashSaleError::InvalidWindow);
        }
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.product_id) {
                return Err(FlashSaleError::DuplicateProduct(item.product_id));
            }
            let base = base_prices
                .get(&item.product_id)
                .copied()
                .ok_or(FlashSaleError::UnknownProduct(item.product_id))?;
            if item.flash_price_minor < 0 || item.flash_price_minor >= base {
                return Err(FlashSaleError::PriceNotBelowBase {
                    flash_minor: item.flash_price_minor,
                    base_minor: base,
                });
            }
            if item.stock_limit.is_some_and(|l| l < 0) {
                return Err(FlashSaleError::InvalidLimit("stockLimit must be >= 0"));
            }
            if item.per_user_limit.is_some_and(|l| l < 1) {
                return Err(FlashSaleError::InvalidLimit("perUserLimit must be >= 1"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlashSaleError {
    #[error("flash sale stock exceeded, remaining: {remaining}")]
    StockExceeded { remaining: i32 },

    #[error("per-user limit ({limit}) exceeded")]
    PerUserLimitExceeded { limit: i32 },

    #[error("flashPrice ({flash_minor}) must be less than base price ({base_minor})")]
    PriceNotBelowBase { flash_minor: i64, base_minor: i64 },

    #[error("endDate must be greater than startDate")]
    InvalidWindow,

    #[error("duplicate product in campaign items: {0}")]
    DuplicateProduct(Uuid),

    #[error("product not found: {0}")]
    UnknownProduct(Uuid),

    #[error("{0}")]
    InvalidLimit(&'static str),
}

/// Resolves which campaign, if any, prices a product right now, and enforces
/// the campaign's quantity caps.
pub struct FlashPricingEngine;

impl FlashPricingEngine {
    /// Among campaigns whose window covers `now` and which include the
    /// product, pick the one with the earliest start date (ties broken by
    /// smallest id). The storage collection order never matters.
    pub fn resolve<'a>(
        product_id: Uuid,
        campaigns: &'a [FlashSaleCampaign],
        now: DateTime<Utc>,
    ) -> Option<(&'a FlashSaleCampaign, &'a FlashSaleItem)> {
        campaigns
            .iter()
            .filter(|c| c.status(now) == CampaignStatus::Active)
            .filter_map(|c| c.item_for(product_id).map(|item| (c, item)))
            .min_by_key(|(c, _)| (c.start_date, c.id))
    }

    /// Enforce campaign caps for one more line of `quantity` units.
    ///
    /// `already_in_order` is the quantity this order has already priced for
    /// the same campaign+product pair, so a single order cannot slip past
    /// `stock_limit` across multiple lines. The per-user cap is checked only
    /// when a customer identity is present, and only against the current
    /// order (historical enforcement is out of scope).
    pub fn check_limits(
        item: &FlashSaleItem,
        quantity: i32,
        already_in_order: i32,
        identified: bool,
    ) -> Result<(), FlashSaleError> {
        if let Some(limit) = item.stock_limit {
            let remaining = limit - item.sold_count - already_in_order;
            if remaining <= 0 || quantity > remaining {
                return Err(FlashSaleError::StockExceeded {
                    remaining: remaining.max(0),
                });
            }
        }
        if identified {
            if let Some(limit) = item.per_user_limit {
                if already_in_order + quantity > limit {
                    return Err(FlashSaleError::PerUserLimitExceeded { limit });
                }
            }
        }
        Ok(())
    }
}
