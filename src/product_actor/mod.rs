//! Product records kept by a `ResourceActor`, including committed stock.

mod actions;
pub mod entity;

pub use actions::*;
