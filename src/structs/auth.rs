use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::User;

#[derive(Serialize, Validate, Debug, Clone)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Serialize, Validate, Debug, Clone)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// Body of resend-email-otp and request-forgot-password-otp.
#[derive(Serialize, Validate, Debug, Clone, PartialEq)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct VerifyOtpResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Session token after email verification, reset token after a
    /// forgot-password verification.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Serialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        must_match(other = "confirm_password", message = "Passwords do not match")
    )]
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}
