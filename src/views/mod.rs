//! List and detail views over the user's records and the blog.

pub mod blog;
pub mod qr_detail;
pub mod qr_list;

use thiserror::Error;

use crate::client::ApiError;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("No item with id {0}")]
    NotFound(String),
    #[error("Type the exact name to confirm")]
    ConfirmationMismatch,
    #[error("Only dynamic QR codes can be paused")]
    NotDynamic,
    #[error("A request for this item is already in progress")]
    Busy,
    #[error("{0}")]
    Invalid(String),
}

/// Type-to-confirm step in front of a destructive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    id: String,
    label: String,
    typed: String,
}

impl DeleteConfirmation {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            typed: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The text the user has to type.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_typed(&mut self, typed: impl Into<String>) {
        self.typed = typed.into();
    }

    /// Exact, case-sensitive match; no trimming.
    pub fn is_enabled(&self) -> bool {
        self.typed == self.label
    }
}
