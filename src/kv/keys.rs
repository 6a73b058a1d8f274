use crate::domain::{ProductId, UserId};

pub const STOCK_PREFIX: &str = "stock:";
pub const PRODUCT_LOCK_PREFIX: &str = "product_lock:";
pub const CHECKOUT_LOCK_PREFIX: &str = "checkout_lock:";

pub fn stock_key(product_id: ProductId) -> String {
    format!("{STOCK_PREFIX}{product_id}")
}

pub fn product_lock_key(product_id: ProductId) -> String {
    format!("{PRODUCT_LOCK_PREFIX}{product_id}")
}

/// Serializes checkouts of one user so a balance is never spent twice.
pub fn checkout_lock_key(user_id: UserId) -> String {
    format!("{CHECKOUT_LOCK_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_and_lock_keys_never_collide() {
        let id = ProductId(42);
        assert_eq!(stock_key(id), "stock:42");
        assert_eq!(product_lock_key(id), "product_lock:42");
        assert_eq!(checkout_lock_key(UserId(42)), "checkout_lock:42");
        assert_ne!(stock_key(id), product_lock_key(id));
    }
}
