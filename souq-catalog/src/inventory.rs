use crate::product::Product;

/// Where a resolved stock check points and, for root/flat targets, where the
/// staged decrement will be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockTarget {
    /// Root `stock` counter.
    Root,
    /// Index into the product's flat `sizes` array.
    FlatSize(usize),
    /// Matched inside `colors[color].sizes[size]`. Validated for availability
    /// only; the decrement is not written back to the nested slot. Known
    /// asymmetry inherited from the catalog's write path.
    ColorSize { color: usize, size: usize },
}

/// Outcome of inventory resolution for one order line.
#[derive(Debug, Clone)]
pub struct ResolvedStock {
    pub target: StockTarget,
    pub available: i32,
    /// Size recorded on the order line. Cleared when a requested size fell
    /// back to root stock because the product declares no size arrays.
    pub size: Option<String>,
}

impl ResolvedStock {
    /// Stage the decrement on an owned product snapshot. Color-nested targets
    /// leave the persisted fields untouched.
    pub fn stage(&self, product: &mut Product, quantity: i32) {
        match self.target {
            StockTarget::Root => product.stock -= quantity,
            StockTarget::FlatSize(index) => product.sizes[index].stock -= quantity,
            StockTarget::ColorSize { .. } => {}
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("size '{size}' not found")]
    SizeNotFound { size: String },

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },
}

/// Resolves which stock slot an order line draws from.
pub struct InventoryResolver;

impl InventoryResolver {
    /// Fallback order: flat sizes, then color-nested sizes, then root stock
    /// when no size arrays exist at all. A named size that is missing while
    /// size arrays do exist is an error.
    pub fn resolve(
        product: &Product,
        requested_size: Option<&str>,
        quantity: i32,
    ) -> Result<ResolvedStock, InventoryError> {
        let size = match requested_size.map(str::trim).filter(|s| !s.is_empty()) {
            None => return Self::resolve_root(product, quantity, None),
            Some(size) => size,
        };

        if let Some(index) = product.sizes.iter().position(|s| s.name == size) {
            return Self::check(
                StockTarget::FlatSize(index),
                product.sizes[index].stock,
                quantity,
                Some(size.to_string()),
            );
        }

        for (color_index, color) in product.colors.iter().enumerate() {
            if let Some(size_index) = color.sizes.iter().position(|s| s.name == size) {
                return Self::check(
                    StockTarget::ColorSize {
                        color: color_index,
                        size: size_index,
                    },
                    color.sizes[size_index].stock,
                    quantity,
                    Some(size.to_string()),
                );
            }
        }

        if !product.has_size_arrays() {
            // Size supplied for a non-sized product: treat as a plain purchase
            // against root stock and drop the size designator.
            return Self::resolve_root(product, quantity, None);
        }

        Err(InventoryError::SizeNotFound {
            size: size.to_string(),
        })
    }

    fn resolve_root(
        product: &Product,
        quantity: i32,
        size: Option<String>,
    ) -> Result<ResolvedStock, InventoryError> {
        Self::check(StockTarget::Root, product.stock, quantity, size)
    }

    fn check(
        target: StockTarget,
        available: i32,
        quantity: i32,
        size: Option<String>,
    ) -> Result<ResolvedStock, InventoryError> {
        if available < quantity {
            return Err(InventoryError::InsufficientStock {
                available,
                requested: quantity,
            });
        }
        Ok(ResolvedStock {
            target,
            available,
            size,
        })
    }
}
