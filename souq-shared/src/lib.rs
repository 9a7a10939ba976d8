pub mod contact;
pub mod currency;
pub mod identity;

pub use contact::{ContactInfo, Recipient, ShippingAddress};
pub use currency::CurrencyTable;
pub use identity::CustomerIdentity;
