//! Create/edit and auth flow controllers.
//!
//! Every network step is split into a synchronous `begin_*` (local checks,
//! guard to submitting, returns the request) and `finish_*` (applies the
//! outcome). The async drivers compose the two.

pub mod auth;
pub mod create;
pub mod edit;
pub mod otp;
pub mod password_reset;
pub mod stage;
pub mod submit;
pub mod upload;

use thiserror::Error;
use validator::ValidationErrors;

use crate::client::ApiError;
use crate::models::style::StyleViolation;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Choose a QR code type first")]
    NoContentType,
    #[error("{0}")]
    Invalid(String),
    #[error("{}", describe_violations(.0))]
    InvalidStyle(Vec<StyleViolation>),
    #[error("A request is already in progress")]
    Busy,
    #[error("This action is not available right now")]
    WrongStep,
    #[error("The content of a static QR code cannot change")]
    PayloadLocked,
    #[error("Please wait {0} seconds before requesting a new code")]
    Cooldown(i64),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

impl FlowError {
    /// Text for the inline error next to the triggering form.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Where the UI should go after a completed flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    QrDetail { id: String },
    QrList,
    Login,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::QrDetail { id } => format!("/qrcodes/{}", id),
            Route::QrList => "/qrcodes".to_string(),
            Route::Login => "/login".to_string(),
        }
    }
}

fn describe_violations(violations: &[StyleViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// First human-readable message out of a validator result.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .next()
        .unwrap_or_else(|| "Please check the form".to_string())
}
