//! Forgot-password: `RequestOtp → VerifyOtp → ResetPassword → Done`.

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::client::Backend;
use crate::flow::otp::{OtpPurpose, VerifyOtpForm};
use crate::flow::submit::SubmitGuard;
use crate::flow::{FlowError, Route, validation_message};
use crate::structs::auth::{EmailRequest, ResetPasswordRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    RequestOtp,
    VerifyOtp,
    ResetPassword,
    Done,
}

#[derive(Debug, Clone)]
pub struct ForgotPasswordFlow {
    step: ResetStep,
    email: String,
    otp: Option<VerifyOtpForm>,
    reset_token: Option<String>,
    guard: SubmitGuard,
    error: Option<String>,
}

impl Default for ForgotPasswordFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ForgotPasswordFlow {
    pub fn new() -> Self {
        Self {
            step: ResetStep::RequestOtp,
            email: String::new(),
            otp: None,
            reset_token: None,
            guard: SubmitGuard::new(),
            error: None,
        }
    }

    pub fn step(&self) -> ResetStep {
        self.step
    }

    pub fn error(&self) -> Option<&str> {
        match (&self.otp, self.step) {
            (Some(form), ResetStep::VerifyOtp) => form.error(),
            _ => self.error.as_deref(),
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into().trim().to_string();
    }

    pub fn otp_form(&self) -> Option<&VerifyOtpForm> {
        self.otp.as_ref()
    }

    pub fn otp_form_mut(&mut self) -> Option<&mut VerifyOtpForm> {
        self.otp.as_mut()
    }

    fn fail(&mut self, err: FlowError) -> FlowError {
        self.error = Some(err.user_message());
        err
    }

    pub async fn request_otp(
        &mut self,
        backend: &dyn Backend,
        now: DateTime<Utc>,
    ) -> Result<(), FlowError> {
        if self.step != ResetStep::RequestOtp {
            return Err(FlowError::WrongStep);
        }
        let request = EmailRequest {
            email: self.email.clone(),
        };
        if let Err(e) = request.validate() {
            return Err(self.fail(FlowError::Invalid(validation_message(&e))));
        }
        self.guard.try_begin()?;
        let outcome = backend.request_forgot_password_otp(&request).await;
        self.guard.settle();

        match outcome {
            Ok(_) => {
                self.otp = Some(VerifyOtpForm::new(
                    self.email.clone(),
                    OtpPurpose::ForgotPassword,
                    now,
                ));
                self.step = ResetStep::VerifyOtp;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("Requesting a reset code for {} failed: {}", self.email, e);
                Err(self.fail(FlowError::Api(e)))
            }
        }
    }

    /// The verify response carries the token that authorises the reset.
    pub async fn verify(&mut self, backend: &dyn Backend) -> Result<(), FlowError> {
        let form = match (self.step, self.otp.as_mut()) {
            (ResetStep::VerifyOtp, Some(form)) => form,
            _ => return Err(FlowError::WrongStep),
        };
        let response = form.verify(backend).await?;
        match response.token {
            Some(token) => {
                self.reset_token = Some(token);
                self.step = ResetStep::ResetPassword;
                self.error = None;
                Ok(())
            }
            None => {
                log::error!("Reset code verified but no reset token was returned");
                Err(self.fail(FlowError::Invalid(
                    "Could not start the password reset, please try again".to_string(),
                )))
            }
        }
    }

    pub async fn reset(
        &mut self,
        backend: &dyn Backend,
        password: &str,
        confirm_password: &str,
    ) -> Result<Route, FlowError> {
        let token = match (self.step, &self.reset_token) {
            (ResetStep::ResetPassword, Some(token)) => token.clone(),
            _ => return Err(FlowError::WrongStep),
        };
        let request = ResetPasswordRequest {
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        };
        if let Err(e) = request.validate() {
            return Err(self.fail(FlowError::Invalid(validation_message(&e))));
        }
        self.guard.try_begin()?;
        let outcome = backend.reset_password(&token, &request).await;
        self.guard.settle();

        match outcome {
            Ok(_) => {
                log::info!("Password reset for {}", self.email);
                self.reset_token = None;
                self.step = ResetStep::Done;
                self.error = None;
                Ok(Route::Login)
            }
            Err(e) => {
                log::warn!("Password reset for {} failed: {}", self.email, e);
                Err(self.fail(FlowError::Api(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeBackend, VALID_OTP};

    async fn verified(backend: &FakeBackend) -> ForgotPasswordFlow {
        let mut flow = ForgotPasswordFlow::new();
        flow.set_email(" user@example.com ");
        flow.request_otp(backend, Utc::now()).await.unwrap();
        flow.otp_form_mut().unwrap().set_code(VALID_OTP);
        flow.verify(backend).await.unwrap();
        flow
    }

    #[actix_web::test]
    async fn full_reset_carries_the_verify_token() {
        let backend = FakeBackend::new();
        let mut flow = verified(&backend).await;
        assert_eq!(flow.step(), ResetStep::ResetPassword);

        let route = flow
            .reset(&backend, "new-password", "new-password")
            .await
            .unwrap();
        assert_eq!(route, Route::Login);
        assert_eq!(flow.step(), ResetStep::Done);
        assert_eq!(
            backend.calls(),
            vec![
                "request_forgot_password_otp",
                "verify_forgot_password_otp",
                "reset_password"
            ]
        );
    }

    #[actix_web::test]
    async fn mismatched_passwords_stay_local() {
        let backend = FakeBackend::new();
        let mut flow = verified(&backend).await;

        let result = flow.reset(&backend, "new-password", "other-password").await;
        assert!(matches!(result, Err(FlowError::Invalid(_))));
        assert_eq!(flow.error(), Some("Passwords do not match"));

        let result = flow.reset(&backend, "short", "short").await;
        assert!(matches!(result, Err(FlowError::Invalid(_))));
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(flow.step(), ResetStep::ResetPassword);
    }

    #[actix_web::test]
    async fn bad_email_is_rejected_before_sending() {
        let backend = FakeBackend::new();
        let mut flow = ForgotPasswordFlow::new();
        flow.set_email("not-an-email");
        assert!(flow.request_otp(&backend, Utc::now()).await.is_err());
        assert_eq!(flow.error(), Some("Invalid email address"));
        assert!(backend.calls().is_empty());
    }

    #[actix_web::test]
    async fn steps_cannot_be_skipped() {
        let backend = FakeBackend::new();
        let mut flow = ForgotPasswordFlow::new();
        assert!(matches!(flow.verify(&backend).await, Err(FlowError::WrongStep)));
        assert!(matches!(
            flow.reset(&backend, "password1", "password1").await,
            Err(FlowError::WrongStep)
        ));
    }
}
