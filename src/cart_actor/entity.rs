use crate::actor_framework::Entity;
use crate::domain::{Cart, ProductId, UserId};

#[derive(Debug, Clone)]
pub enum CartAction {
    /// Sets a line's quantity. Zero removes the line.
    SetLine { product_id: ProductId, quantity: u32 },
    Clear,
}

impl Entity for Cart {
    type Id = UserId;
    type Action = CartAction;
    type ActionResult = Cart;

    fn id(&self) -> &UserId { &self.user_id }

    fn handle_action(&mut self, action: CartAction) -> Result<Cart, String> {
        match action {
            CartAction::SetLine { product_id, quantity: 0 } => {
                self.lines.retain(|line| line.product_id != product_id);
            }
            CartAction::SetLine { product_id, quantity } => {
                self.set_line(product_id, quantity);
            }
            CartAction::Clear => self.lines.clear(),
        }
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_line_replaces_and_zero_removes() {
        let mut cart = Cart::empty(UserId(1));
        cart.handle_action(CartAction::SetLine { product_id: ProductId(7), quantity: 2 }).unwrap();
        cart.handle_action(CartAction::SetLine { product_id: ProductId(7), quantity: 5 }).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.line(ProductId(7)).map(|l| l.quantity), Some(5));

        let cart = cart.handle_action(CartAction::SetLine { product_id: ProductId(7), quantity: 0 }).unwrap();
        assert!(cart.lines.is_empty());
    }
}
