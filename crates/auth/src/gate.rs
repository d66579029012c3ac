//! Admission control for views that need an authenticated session.

use crate::session::SessionState;

/// What a protected view should do for the current session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session not restored yet: render nothing, not even a redirect.
    Wait,
    /// Render the protected view.
    Admit,
    /// Send the user to the login view instead.
    Redirect(String),
}

/// Decides, per navigation, whether a protected view may render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGate {
    login_path: String,
}

impl RouteGate {
    pub const DEFAULT_LOGIN_PATH: &'static str = "/login";

    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn check(&self, state: &SessionState) -> GateDecision {
        match state {
            SessionState::Initializing => GateDecision::Wait,
            SessionState::LoggedIn(_) => GateDecision::Admit,
            SessionState::LoggedOut => GateDecision::Redirect(self.login_path.clone()),
        }
    }
}

impl Default for RouteGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LOGIN_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AuthToken, Identity};

    #[test]
    fn initializing_renders_nothing() {
        let gate = RouteGate::default();
        assert_eq!(gate.check(&SessionState::Initializing), GateDecision::Wait);
    }

    #[test]
    fn logged_out_redirects_to_login() {
        let gate = RouteGate::default();
        assert_eq!(
            gate.check(&SessionState::LoggedOut),
            GateDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn logged_in_is_admitted() {
        let gate = RouteGate::new("/signin");
        let identity = Identity::new("a@b.com", AuthToken::new("t1").unwrap());
        assert_eq!(gate.check(&SessionState::LoggedIn(identity)), GateDecision::Admit);
        assert_eq!(gate.login_path(), "/signin");
    }
}
