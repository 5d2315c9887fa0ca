//! Session context: the signed-in user's token and identity.
//!
//! Created once at startup with [`SessionContext::restore`], changed only by
//! [`SessionContext::login`] / [`SessionContext::logout`], and handed to
//! whatever needs it. There is no global session.

pub mod store;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::user::User;
use crate::structs::auth::LoginResponse;
use crate::utils::jwt::read_claims;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please sign in to continue")]
    Unauthenticated,
    #[error("Your session has expired, please sign in again")]
    Expired,
    #[error("Invalid session token: {0}")]
    InvalidToken(String),
    #[error("Could not persist session: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a session from a backend token, rejecting expired ones.
    pub fn from_token(token: &str, now: DateTime<Utc>) -> Result<Self, SessionError> {
        let claims = read_claims(token).map_err(|e| SessionError::InvalidToken(e.to_string()))?;
        if claims.is_expired(now) {
            return Err(SessionError::Expired);
        }
        Ok(Self {
            token: token.to_string(),
            user: User::from_claims(&claims),
            expires_at: claims.expires_at(),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now >= expiry)
    }
}

pub struct SessionContext {
    store: Box<dyn TokenStore>,
    current: Option<Session>,
}

impl SessionContext {
    /// Silently restores a persisted session. Unreadable or expired tokens
    /// are cleared from the store.
    pub fn restore(store: Box<dyn TokenStore>) -> Self {
        let mut context = Self {
            store,
            current: None,
        };

        let token = match context.store.load() {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Failed to read stored session: {}", e);
                None
            }
        };

        if let Some(token) = token {
            match Session::from_token(&token, Utc::now()) {
                Ok(session) => {
                    log::info!("Restored session for {}", session.user.display_name());
                    context.current = Some(session);
                }
                Err(e) => {
                    log::info!("Discarding stored session: {}", e);
                    if let Err(e) = context.store.clear() {
                        log::warn!("Failed to clear stored session: {}", e);
                    }
                }
            }
        }

        context
    }

    /// Starts a session from a login (or verified-signup) response.
    pub fn login(&mut self, response: LoginResponse) -> Result<&Session, SessionError> {
        let mut session = Session::from_token(&response.token, Utc::now())?;
        if let Some(user) = response.user {
            session.user = user;
        }
        self.store.save(&session.token)?;
        log::info!("Signed in as {}", session.user.display_name());
        Ok(&*self.current.insert(session))
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.current.take() {
            log::info!("Signed out {}", session.user.display_name());
        }
        if let Err(e) = self.store.clear() {
            log::warn!("Failed to clear stored session: {}", e);
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current
            .as_ref()
            .filter(|session| !session.is_expired(Utc::now()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Route guard for protected views.
    pub fn require(&self) -> Result<&Session, SessionError> {
        match &self.current {
            None => Err(SessionError::Unauthenticated),
            Some(session) if session.is_expired(Utc::now()) => Err(SessionError::Expired),
            Some(session) => Ok(session),
        }
    }
}
