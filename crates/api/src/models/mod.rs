//! Domain models for the API.
//!
//! These types represent validated domain objects separate from database
//! row types. Wire names follow what the storefront client reads (`_id`,
//! camelCase fields).

pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderDraft, OrderOwnerView, OrderUser, OrderView};
pub use product::{Product, ProductDraft, ProductFilter, ProductPatch};
pub use user::{NewUser, User, UserAddress, UserSummary};
