pub mod flash;
pub mod inventory;
pub mod product;

pub use flash::{
    CampaignStatus, FlashPricingEngine, FlashSaleCampaign, FlashSaleError, FlashSaleItem,
};
pub use inventory::{InventoryError, InventoryResolver, ResolvedStock, StockTarget};
pub use product::{ColorVariant, Product, SizeStock};
