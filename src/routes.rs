//! Views, their access rules, and the navigation links a session sees.

use std::fmt;

use crate::domain::Role;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Products,
    Cart,
    Orders,
    Admin,
    Login,
    Signup,
    Contact,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Products => "/products",
            Route::Cart => "/cart",
            Route::Orders => "/orders",
            Route::Admin => "/admin",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Contact => "/contact",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Signup | Route::Contact)
    }

    pub fn admin_only(&self) -> bool {
        matches!(self, Route::Admin)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// The session is still being restored.
    Pending,
    Redirect(Route),
}

pub fn guard(route: Route, session: &SessionState) -> Access {
    if route.is_public() {
        return Access::Granted;
    }
    match session {
        SessionState::Loading => Access::Pending,
        SessionState::SignedOut => Access::Redirect(Route::Login),
        SessionState::SignedIn(user) if route.admin_only() && !user.is_admin() => Access::Redirect(Route::Home),
        SessionState::SignedIn(_) => Access::Granted,
    }
}

/// Links shown in the navigation bar.
pub fn nav_links(session: &SessionState) -> Vec<Route> {
    match session.user().map(|u| u.role) {
        None => vec![Route::Login, Route::Signup],
        Some(Role::Admin) => vec![Route::Admin],
        Some(Role::User) => vec![Route::Home, Route::Products, Route::Orders, Route::Cart],
    }
}
