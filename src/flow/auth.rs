//! Sign-in and sign-up forms.

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::client::Backend;
use crate::flow::otp::{OtpPurpose, VerifyOtpForm};
use crate::flow::submit::SubmitGuard;
use crate::flow::{FlowError, Route, validation_message};
use crate::session::SessionContext;
use crate::structs::auth::{LoginRequest, LoginResponse, RegisterRequest};

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    guard: SubmitGuard,
    error: Option<String>,
}

impl LoginForm {
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn submit(
        &mut self,
        backend: &dyn Backend,
        session: &mut SessionContext,
    ) -> Result<Route, FlowError> {
        let request = LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        if let Err(e) = request.validate() {
            let err = FlowError::Invalid(validation_message(&e));
            self.error = Some(err.user_message());
            return Err(err);
        }
        self.guard.try_begin()?;
        let outcome = backend.login(&request).await;
        self.guard.settle();

        let result = match outcome {
            Ok(response) => session.login(response).map(|_| Route::QrList).map_err(FlowError::from),
            Err(e) => Err(FlowError::Api(e)),
        };
        match &result {
            Ok(_) => {
                self.password.clear();
                self.error = None;
            }
            Err(e) => {
                log::warn!("Sign-in for {} failed: {}", request.email, e);
                self.error = Some(e.user_message());
            }
        }
        result
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    guard: SubmitGuard,
    error: Option<String>,
}

impl RegisterForm {
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Registers and hands over to email verification.
    pub async fn submit(
        &mut self,
        backend: &dyn Backend,
        now: DateTime<Utc>,
    ) -> Result<VerifyOtpForm, FlowError> {
        let request = RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        if let Err(e) = request.validate() {
            let err = FlowError::Invalid(validation_message(&e));
            self.error = Some(err.user_message());
            return Err(err);
        }
        self.guard.try_begin()?;
        let outcome = backend.register(&request).await;
        self.guard.settle();

        match outcome {
            Ok(_) => {
                log::info!("Registered {}, awaiting email verification", request.email);
                self.error = None;
                Ok(VerifyOtpForm::new(request.email, OtpPurpose::VerifyEmail, now))
            }
            Err(e) => {
                log::warn!("Registration for {} failed: {}", request.email, e);
                self.error = Some(e.user_message());
                Err(FlowError::Api(e))
            }
        }
    }
}

/// Verifies the sign-up code. A token in the response signs the user in
/// straight away; otherwise they are sent to the sign-in page.
pub async fn complete_signup(
    form: &mut VerifyOtpForm,
    backend: &dyn Backend,
    session: &mut SessionContext,
) -> Result<Route, FlowError> {
    if form.purpose() != OtpPurpose::VerifyEmail {
        return Err(FlowError::WrongStep);
    }
    let response = form.verify(backend).await?;
    match response.token {
        Some(token) => {
            session.login(LoginResponse { token, user: None })?;
            Ok(Route::QrList)
        }
        None => Ok(Route::Login),
    }
}
