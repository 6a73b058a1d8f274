use rust_decimal::Decimal;
use super::ProductId;

/// A catalog product as the durable store sees it.
///
/// `stock` is the committed unit count. It is narrower than the cached
/// counter, which is widened to 64 bits while it lives in the key-value service.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
        }
    }
}
