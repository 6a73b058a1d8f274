//! Typed clients over the generic resource actors.
//!
//! Each client wraps a `ResourceClient<T>`, gets its get/insert/delete/list
//! methods from `impl_basic_client!`, and adds entity-specific actions by hand.

#[macro_use]
mod macros;
pub mod product_client;
pub mod account_client;
pub mod cart_client;

pub use product_client::ProductClient;
pub use account_client::AccountClient;
pub use cart_client::CartClient;
