//! System orchestration, startup, and shutdown logic.

pub mod inventory_system;
pub mod tracing;
pub mod error;

pub use inventory_system::*;
pub use tracing::*;
pub use error::*;
