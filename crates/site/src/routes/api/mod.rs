//! JSON API handlers.

pub mod admin;
pub mod billing;
pub mod content;
