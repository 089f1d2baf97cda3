//! Navigation gating by authentication and role.

use tracing::instrument;

use shopfront_core::Role;

use crate::session::{Session, SessionSnapshot};

/// Access requirements attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteMeta {
    /// Whether an authenticated session is required.
    pub requires_auth: bool,
    /// The role the session identity must hold, if any.
    pub role: Option<Role>,
}

/// A navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub meta: RouteMeta,
}

impl Route {
    /// A route anyone can visit.
    #[must_use]
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            meta: RouteMeta::default(),
        }
    }

    /// A route restricted to authenticated users of one role.
    #[must_use]
    pub fn protected(path: impl Into<String>, role: Role) -> Self {
        Self {
            path: path.into(),
            meta: RouteMeta {
                requires_auth: true,
                role: Some(role),
            },
        }
    }

    /// A route requiring any authenticated user.
    #[must_use]
    pub fn authenticated(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            meta: RouteMeta {
                requires_auth: true,
                role: None,
            },
        }
    }
}

/// The guard's verdict on a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(String),
}

/// Runs before every navigation.
#[derive(Clone)]
pub struct RouteGuard {
    session: Session,
    default_route: String,
}

impl RouteGuard {
    /// Create a guard that sends role mismatches to `default_route`.
    #[must_use]
    pub fn new(session: Session, default_route: impl Into<String>) -> Self {
        Self {
            session,
            default_route: default_route.into(),
        }
    }

    /// Decide a navigation, initializing the session first if needed.
    #[instrument(skip(self, route), fields(path = %route.path))]
    pub async fn before_each(&self, route: &Route) -> Navigation {
        if !self.session.is_authenticated() {
            self.session.init_auth().await;
        }

        let navigation = self.decide(route, &self.session.snapshot());
        if let Navigation::Redirect(target) = &navigation {
            tracing::debug!(redirect = %target, "Navigation redirected");
        }
        navigation
    }

    /// Decide a navigation against a session snapshot. No side effects.
    #[must_use]
    pub fn decide(&self, route: &Route, session: &SessionSnapshot) -> Navigation {
        if !route.meta.requires_auth {
            return Navigation::Allow;
        }

        if !session.is_authenticated() {
            let target = route
                .meta
                .role
                .map_or_else(|| self.default_route.clone(), Role::login_path);
            return Navigation::Redirect(target);
        }

        match route.meta.role {
            Some(required) if session.role() != Some(required) => {
                Navigation::Redirect(self.default_route.clone())
            }
            _ => Navigation::Allow,
        }
    }
}
