//! Per-user carts. One cart record per user, keyed by the user id.

pub mod entity;

pub use entity::*;
