use serde::{Deserialize, Serialize};
use souq_shared::contact::{is_valid_mobile, ContactInfo, ShippingAddress};
use souq_shared::CustomerIdentity;
use uuid::Uuid;

use crate::error::OrderError;
use crate::models::PaymentMethod;

/// One requested line: a product, a quantity and an optional size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
}

/// Contact details as submitted; all fields optional, resolved against the
/// authenticated identity during validation. `phone` is accepted as a legacy
/// alias for `mobile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub secondary_mobile: Option<String>,
}

/// Payment state a trusted caller may assert after a gateway capture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssertedPaymentStatus {
    Completed,
}

/// An order placement request as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub items: Vec<LineRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub customer_info: CustomerContact,
    pub payment_status: Option<AssertedPaymentStatus>,
    pub payment_reference: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Validated request fields that needed resolution.
#[derive(Debug, Clone)]
pub struct ResolvedPlacement {
    pub contact: ContactInfo,
    pub user_id: Option<Uuid>,
}

impl PlacementRequest {
    /// Structural validation plus contact resolution.
    ///
    /// Email and mobile fall back to the identity's profile values; names
    /// fall back to the identity's display name, then to "Guest"/"User".
    /// Nothing here touches storage.
    pub fn validate(
        &self,
        identity: Option<&CustomerIdentity>,
    ) -> Result<ResolvedPlacement, OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        for line in &self.items {
            if line.quantity < 1 {
                return Err(OrderError::Validation(format!(
                    "Invalid quantity {} for product {}",
                    line.quantity, line.product
                )));
            }
        }

        let email = self
            .customer_info
            .email
            .clone()
            .or_else(|| identity.and_then(|u| u.email.clone()));
        let mobile = self
            .customer_info
            .mobile
            .clone()
            .or_else(|| identity.and_then(|u| u.mobile.clone()))
            .or_else(|| self.customer_info.phone.clone());
        let (email, mobile) = match (email, mobile) {
            (Some(e), Some(m)) => (e, m),
            _ => {
                return Err(OrderError::Validation(
                    "Customer email and mobile number are required".to_string(),
                ))
            }
        };
        if !is_valid_mobile(&mobile) {
            return Err(OrderError::Validation(format!(
                "Invalid mobile number format: {mobile}"
            )));
        }
        if let Some(secondary) = self
            .customer_info
            .secondary_mobile
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            if !is_valid_mobile(secondary) {
                return Err(OrderError::Validation(
                    "Invalid secondary mobile number format".to_string(),
                ));
            }
        }

        if !self.shipping_address.is_complete() {
            return Err(OrderError::Validation(
                "Complete shipping address is required".to_string(),
            ));
        }

        let first_name = self
            .customer_info
            .first_name
            .clone()
            .or_else(|| identity.and_then(|u| u.first_name()))
            .unwrap_or_else(|| "Guest".to_string());
        let last_name = self
            .customer_info
            .last_name
            .clone()
            .or_else(|| identity.and_then(|u| u.last_name()))
            .unwrap_or_else(|| "User".to_string());

        Ok(ResolvedPlacement {
            contact: ContactInfo {
                first_name,
                last_name,
                email,
                mobile,
                secondary_mobile: self.customer_info.secondary_mobile.clone(),
            },
            user_id: identity.map(|u| u.id),
        })
    }
}
