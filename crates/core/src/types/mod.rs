//! Core types for Yard Patrol.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;

pub use email::{Email, EmailError};
pub use id::UserId;
pub use price::{CurrencyCode, Price};
