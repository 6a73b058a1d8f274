pub mod ids;
pub mod user;
pub mod product;
pub mod cart;

pub use ids::*;
pub use user::*;
pub use product::*;
pub use cart::*;
