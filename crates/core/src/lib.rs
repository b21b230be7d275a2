//! Yard Patrol Core - Shared domain library.
//!
//! This crate provides the pieces of the Yard Patrol portal that do not depend on
//! a web framework:
//! - `site` - Public marketing site, customer portal and admin portal
//! - `cli` - Operator tooling
//!
//! # Architecture
//!
//! The core crate contains types, traits and pure decision logic - no sockets,
//! no HTTP clients, no session backends. Collaborators (session storage, the
//! identity provider, the admin login backend, navigation) are traits that the
//! `site` crate implements, which keeps the guard and the login flow testable
//! with in-memory doubles.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user IDs, emails and prices
//! - [`session`] - Resolved visitor session (`user` + `loading`)
//! - [`store`] - Key/value session store trait and fixed keys
//! - [`navigator`] - Navigation commands and portal routes
//! - [`guard`] - Route protection decisions and the reactive guard
//! - [`identity`] - Identity provider adapter surface
//! - [`login`] - Admin login form validation and submit flow
//! - [`content`] - Inline content-editing helper over the session store
//! - [`billing`] - Service plans and their Stripe price wiring

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod content;
pub mod guard;
pub mod identity;
pub mod login;
pub mod navigator;
pub mod session;
pub mod store;
pub mod types;

pub use guard::{GuardDecision, GuardView, RouteGuard};
pub use navigator::Navigator;
pub use session::{ADMIN_ROLE, Session, UserMetadata, UserRecord};
pub use store::{SessionStore, StoreError};
pub use types::*;
