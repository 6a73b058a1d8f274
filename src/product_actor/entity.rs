use crate::actor_framework::Entity;
use crate::domain::{Product, ProductId};
use super::actions::{ProductAction, ProductActionResult};

impl Entity for Product {
    type Id = ProductId;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;

    fn id(&self) -> &ProductId { &self.id }

    /// Rejects unnamed products and negative prices.
    fn on_insert(&mut self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("Product {} has no name", self.id));
        }
        if self.price.is_sign_negative() {
            return Err(format!("Product {} has a negative price: {}", self.id, self.price));
        }
        Ok(())
    }

    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, String> {
        match action {
            ProductAction::CheckStock => {
                Ok(ProductActionResult::StockLevel(self.stock))
            }
            ProductAction::SetStock(stock) => {
                let previous = std::mem::replace(&mut self.stock, stock);
                Ok(ProductActionResult::StockSet { previous })
            }
        }
    }
}
