//! Route protection.
//!
//! [`GuardDecision::evaluate`] is the pure rule. [`RouteGuard`] wraps it for a
//! single protected view: it remembers the inputs it last reacted to and only
//! issues navigation when those inputs change, so observing the same session
//! twice never redirects twice.

use crate::navigator::{Navigator, routes};
use crate::session::Session;
use crate::types::UserId;

/// Outcome of evaluating a session against a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session resolution is still pending.
    Loading,
    /// Nobody is signed in.
    RedirectToSignIn,
    /// Signed in, but the view requires the admin role.
    RedirectToLanding,
    /// Render the protected children.
    Render,
}

impl GuardDecision {
    /// Decide what a protected view does for `session`.
    ///
    /// `loading` wins over everything else, so an admin-only view never renders
    /// before the role is known.
    #[must_use]
    pub fn evaluate(session: &Session, require_admin: bool) -> Self {
        if session.loading {
            return Self::Loading;
        }
        match session.user() {
            None => Self::RedirectToSignIn,
            Some(user) if require_admin && !user.is_admin() => Self::RedirectToLanding,
            Some(_) => Self::Render,
        }
    }

    /// Route to navigate to, if this decision redirects.
    #[must_use]
    pub const fn redirect_target(self, routes: &GuardRoutes) -> Option<&'static str> {
        match self {
            Self::RedirectToSignIn => Some(routes.sign_in),
            Self::RedirectToLanding => Some(routes.landing),
            Self::Loading | Self::Render => None,
        }
    }

    /// What the view shows for this decision.
    #[must_use]
    pub const fn view(self) -> GuardView {
        match self {
            Self::Loading => GuardView::LoadingIndicator,
            Self::RedirectToSignIn | Self::RedirectToLanding => GuardView::Nothing,
            Self::Render => GuardView::Children,
        }
    }
}

/// What a guarded view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    /// Neutral loading indicator.
    LoadingIndicator,
    /// Nothing; a redirect has been issued.
    Nothing,
    /// The protected children, unmodified.
    Children,
}

/// Redirect targets used by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardRoutes {
    pub sign_in: &'static str,
    pub landing: &'static str,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            sign_in: routes::SIGN_IN,
            landing: routes::NON_ADMIN_LANDING,
        }
    }
}

/// Inputs the guard reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GuardKey {
    loading: bool,
    user: Option<(UserId, Option<String>)>,
    require_admin: bool,
}

impl GuardKey {
    fn new(session: &Session, require_admin: bool) -> Self {
        Self {
            loading: session.loading,
            user: session
                .user
                .as_ref()
                .map(|user| (user.id.clone(), user.metadata.role.clone())),
            require_admin,
        }
    }
}

/// Guard for one protected view.
#[derive(Debug)]
pub struct RouteGuard<N> {
    navigator: N,
    require_admin: bool,
    routes: GuardRoutes,
    last: Option<GuardKey>,
}

impl<N: Navigator> RouteGuard<N> {
    /// Guard a view that any signed-in visitor may see.
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            require_admin: false,
            routes: GuardRoutes::default(),
            last: None,
        }
    }

    /// Guard a view that requires the admin role.
    pub fn admin(navigator: N) -> Self {
        Self::new(navigator).require_admin(true)
    }

    /// Set whether the view requires the admin role.
    #[must_use]
    pub const fn require_admin(mut self, require_admin: bool) -> Self {
        self.require_admin = require_admin;
        self
    }

    /// Override the redirect targets.
    #[must_use]
    pub const fn with_routes(mut self, routes: GuardRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Change the admin requirement of a mounted guard.
    ///
    /// Takes effect on the next [`observe`](Self::observe).
    pub const fn set_require_admin(&mut self, require_admin: bool) {
        self.require_admin = require_admin;
    }

    /// React to the current session state and return what to render.
    ///
    /// Navigation is issued only when `loading`, the user or the admin
    /// requirement differ from the previous observation.
    pub fn observe(&mut self, session: &Session) -> GuardView {
        let decision = GuardDecision::evaluate(session, self.require_admin);
        let key = GuardKey::new(session, self.require_admin);

        if self.last.as_ref() != Some(&key) {
            self.last = Some(key);
            if let Some(target) = decision.redirect_target(&self.routes) {
                self.navigator.navigate(target);
            }
        }

        decision.view()
    }
}
