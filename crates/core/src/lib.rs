//! Authentic Core - Shared domain types.
//!
//! This crate provides the types used across all Authentic components:
//! - `api` - Public storefront and admin JSON API
//! - `cli` - Command-line tools for migrations, seeding and admin maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain rules - no I/O, no
//! database access, no HTTP clients. The order status state machine lives here
//! so it can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, email, price, statuses and order value objects

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
