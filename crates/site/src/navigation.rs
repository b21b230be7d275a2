//! Server-side navigator.
//!
//! In a server-rendered portal "navigating" means answering with a redirect.
//! [`RedirectSlot`] records the first navigation issued while a request is
//! handled so the handler can turn it into a response.

use std::sync::OnceLock;

use axum::response::Redirect;

use yard_patrol_core::Navigator;

/// Captures the navigation issued during one request.
#[derive(Debug, Default)]
pub struct RedirectSlot(OnceLock<String>);

impl RedirectSlot {
    /// Target of the captured navigation, if any.
    pub fn target(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    /// Redirect response for the captured navigation.
    pub fn redirect(&self) -> Option<Redirect> {
        self.target().map(Redirect::to)
    }
}

impl Navigator for RedirectSlot {
    fn navigate(&self, to: &str) {
        if self.0.set(to.to_string()).is_err() {
            tracing::warn!(to = %to, "Ignoring second navigation in one request");
        }
    }
}
