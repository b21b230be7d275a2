//! Navigation commands.

/// Portal routes the guard and the login flow navigate to.
pub mod routes {
    /// Customer sign-in page.
    pub const SIGN_IN: &str = "/signin";
    /// Where signed-in visitors without the admin role are sent.
    pub const NON_ADMIN_LANDING: &str = "/dashboard";
    /// Admin dashboard, reached after a successful admin login.
    pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
    /// Admin login form.
    pub const ADMIN_LOGIN: &str = "/admin/login";
}

/// Issues navigation to another route.
///
/// Redirects are never performed while a view is rendered; the guard and the
/// login flow call this when their inputs change.
pub trait Navigator {
    /// Navigate to `to`.
    fn navigate(&self, to: &str);
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn navigate(&self, to: &str) {
        (**self).navigate(to);
    }
}
