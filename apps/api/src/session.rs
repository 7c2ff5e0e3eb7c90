#![allow(dead_code)]

//! Session context — caller-owned login state and page authorization.
//!
//! A `SessionContext` is created per client and passed explicitly to whatever
//! needs it. Nothing here is global.
//!
//! This is a library surface for the UI host that renders the login, signup
//! and admin pages. The HTTP API exposes no login routes because credential
//! storage and password hashing live outside this service.
//!
//! ```text
//! Anonymous ──login──▶ User ──elevate──▶ Admin
//!     ▲                  │                 │
//!     └──────logout──────┴─────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("cannot {action} from {from} session")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("user {0} is not an administrator")]
    NotAdmin(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// An authenticated identity. `is_admin` is what the user directory says the
/// account may do; `Role` is what the session currently acts as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated { principal: Principal, role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Login,
    Signup,
    Recommendations,
    AdminPanel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    state: SessionState,
    updated_at: DateTime<Utc>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: SessionState::Anonymous,
            updated_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            SessionState::Authenticated { principal, .. } => Some(principal),
            SessionState::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match &self.state {
            SessionState::Authenticated { role, .. } => Some(*role),
            SessionState::Anonymous => None,
        }
    }

    /// Anonymous → User.
    pub fn login(&mut self, principal: Principal) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Anonymous) {
            return Err(self.invalid("login"));
        }
        info!(
            "Session {} logged in as {}",
            self.session_id, principal.username
        );
        self.transition(SessionState::Authenticated {
            principal,
            role: Role::User,
        });
        Ok(())
    }

    /// User → Admin, only for principals flagged as administrators.
    pub fn elevate(&mut self) -> Result<(), SessionError> {
        let principal = match &self.state {
            SessionState::Authenticated {
                principal,
                role: Role::User,
            } => principal.clone(),
            _ => return Err(self.invalid("elevate")),
        };
        if !principal.is_admin {
            return Err(SessionError::NotAdmin(principal.username));
        }
        info!(
            "Session {} elevated to admin for {}",
            self.session_id, principal.username
        );
        self.transition(SessionState::Authenticated {
            principal,
            role: Role::Admin,
        });
        Ok(())
    }

    /// Any state → Anonymous.
    pub fn logout(&mut self) {
        if let Some(principal) = self.principal() {
            info!(
                "Session {} logged out {}",
                self.session_id, principal.username
            );
        }
        self.transition(SessionState::Anonymous);
    }

    /// Checks whether the current session may open `page`.
    pub fn authorize(&self, page: Page) -> Result<(), AppError> {
        match (page, self.role()) {
            (Page::Login | Page::Signup, _) => Ok(()),
            (Page::Recommendations, Some(_)) => Ok(()),
            (Page::AdminPanel, Some(Role::Admin)) => Ok(()),
            (Page::AdminPanel, Some(Role::User)) => Err(AppError::Forbidden),
            (Page::Recommendations | Page::AdminPanel, None) => Err(AppError::Unauthorized),
        }
    }

    fn transition(&mut self, next: SessionState) {
        self.state = next;
        self.updated_at = Utc::now();
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        let from = match self.role() {
            None => "anonymous",
            Some(Role::User) => "user",
            Some(Role::Admin) => "admin",
        };
        SessionError::InvalidTransition { from, action }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(is_admin: bool) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "asha".to_string(),
            is_admin,
        }
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let session = SessionContext::new();
        assert_eq!(session.state(), &SessionState::Anonymous);
        assert!(session.principal().is_none());
    }

    #[test]
    fn test_login_then_logout() {
        let mut session = SessionContext::new();
        session.login(principal(false)).unwrap();
        assert_eq!(session.role(), Some(Role::User));

        session.logout();
        assert_eq!(session.state(), &SessionState::Anonymous);
    }

    #[test]
    fn test_double_login_rejected() {
        let mut session = SessionContext::new();
        session.login(principal(false)).unwrap();
        assert_eq!(
            session.login(principal(false)).unwrap_err(),
            SessionError::InvalidTransition {
                from: "user",
                action: "login"
            }
        );
    }

    #[test]
    fn test_elevate_requires_login() {
        let mut session = SessionContext::new();
        assert!(matches!(
            session.elevate().unwrap_err(),
            SessionError::InvalidTransition { from: "anonymous", .. }
        ));
    }

    #[test]
    fn test_elevate_requires_admin_flag() {
        let mut session = SessionContext::new();
        session.login(principal(false)).unwrap();
        assert_eq!(
            session.elevate().unwrap_err(),
            SessionError::NotAdmin("asha".to_string())
        );
        assert_eq!(session.role(), Some(Role::User));
    }

    #[test]
    fn test_admin_flow() {
        let mut session = SessionContext::new();
        session.login(principal(true)).unwrap();
        session.elevate().unwrap();
        assert_eq!(session.role(), Some(Role::Admin));
        assert!(session.elevate().is_err());
    }

    #[test]
    fn test_authorize_pages() {
        let mut session = SessionContext::new();
        assert!(session.authorize(Page::Login).is_ok());
        assert!(matches!(
            session.authorize(Page::Recommendations),
            Err(AppError::Unauthorized)
        ));

        session.login(principal(true)).unwrap();
        assert!(session.authorize(Page::Recommendations).is_ok());
        assert!(matches!(
            session.authorize(Page::AdminPanel),
            Err(AppError::Forbidden)
        ));

        session.elevate().unwrap();
        assert!(session.authorize(Page::AdminPanel).is_ok());
        assert!(session.authorize(Page::Signup).is_ok());
    }

    #[test]
    fn test_transition_updates_timestamp() {
        let mut session = SessionContext::new();
        let before = session.updated_at();
        session.login(principal(false)).unwrap();
        assert!(session.updated_at() >= before);
    }
}
