//! Core types for Authentic.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{
    Fulfillment, GuestInfo, OrderItem, OrderOwner, OrderValidationError, PaymentDetails,
    ShippingAddress, Transition, TransitionError, items_total,
};
pub use price::{Price, PriceError};
pub use status::*;
