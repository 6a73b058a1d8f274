use super::{ProductId, UserId};

/// One product line in a user's cart. Owned by the cart store, consumed by checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(user_id: impl Into<UserId>, product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            user_id: user_id.into(),
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// All lines of one user's cart, at most one line per product.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
        }
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Sets the quantity of a product line, appending the line if it is new.
    pub fn set_line(&mut self, product_id: ProductId, quantity: u32) {
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine {
                user_id: self.user_id,
                product_id,
                quantity,
            }),
        }
    }
}
