//! Buyer accounts and their balances.

pub mod entity;

pub use entity::*;
