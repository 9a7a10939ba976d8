use serde::{Deserialize, Serialize};

/// Delivery address captured with an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn is_complete(&self) -> bool {
        !self.street.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.country.trim().is_empty()
    }
}

/// Resolved customer contact details stored on an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_mobile: Option<String>,
}

/// Denormalized customer directory record keyed by (email, mobile).
///
/// Maintained as a side effect of order placement for fulfillment
/// convenience; never authoritative for pricing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_mobile: Option<String>,
    pub address: ShippingAddress,
}

impl Recipient {
    pub fn from_contact(contact: &ContactInfo, address: &ShippingAddress) -> Self {
        Self {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            mobile: contact.mobile.clone(),
            secondary_mobile: contact.secondary_mobile.clone(),
            address: address.clone(),
        }
    }
}

/// Basic E.164-style length check: optional '+' then 7 to 15 digits.
pub fn is_valid_mobile(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
