//! Session keys and view models shared by route handlers.

use serde::{Deserialize, Serialize};

use yard_patrol_core::UserRecord;

/// Keys stored in the visitor session.
pub mod session_keys {
    pub use yard_patrol_core::store::keys::{ADMIN_TOKEN, IDENTITY_TOKEN};
}

/// Header navigation state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavUser {
    pub display_name: String,
    pub is_admin: bool,
}

impl From<&UserRecord> for NavUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            display_name: user.display_name().to_string(),
            is_admin: user.is_admin(),
        }
    }
}
