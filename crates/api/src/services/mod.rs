//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, password hashing and bearer tokens
//! - `google` - Google sign-in and account linking
//! - `notifications` - Order confirmation and admin alert mail
//! - `orders` - Order placement, status changes and reads

pub mod auth;
pub mod google;
pub mod notifications;
pub mod orders;
