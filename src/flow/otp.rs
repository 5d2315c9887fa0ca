//! Six-digit OTP entry with a resend cooldown.

use chrono::{DateTime, Utc};

use crate::client::{ApiResult, Backend};
use crate::flow::submit::SubmitGuard;
use crate::flow::FlowError;
use crate::structs::auth::{EmailRequest, MessageResponse, VerifyOtpRequest, VerifyOtpResponse};

pub const OTP_LENGTH: usize = 6;
pub const RESEND_COOLDOWN_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    VerifyEmail,
    ForgotPassword,
}

#[derive(Debug, Clone)]
pub struct VerifyOtpForm {
    email: String,
    purpose: OtpPurpose,
    code: String,
    last_sent: DateTime<Utc>,
    verify_guard: SubmitGuard,
    resend_guard: SubmitGuard,
    error: Option<String>,
    notice: Option<String>,
}

impl VerifyOtpForm {
    /// `sent_at` is when the backend sent the current code.
    pub fn new(email: impl Into<String>, purpose: OtpPurpose, sent_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            purpose,
            code: String::new(),
            last_sent: sent_at,
            verify_guard: SubmitGuard::new(),
            resend_guard: SubmitGuard::new(),
            error: None,
            notice: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn purpose(&self) -> OtpPurpose {
        self.purpose
    }

    /// Keeps digits only, at most six.
    pub fn set_code(&mut self, input: &str) {
        self.code = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(OTP_LENGTH)
            .collect();
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_complete(&self) -> bool {
        self.code.len() == OTP_LENGTH
    }

    pub fn seconds_until_resend(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.last_sent).num_seconds();
        (RESEND_COOLDOWN_SECS - elapsed).max(0)
    }

    pub fn can_resend(&self, now: DateTime<Utc>) -> bool {
        self.seconds_until_resend(now) == 0 && !self.resend_guard.is_submitting()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.verify_guard.is_submitting()
    }

    pub fn begin_verify(&mut self) -> Result<VerifyOtpRequest, FlowError> {
        if !self.is_complete() {
            let err = FlowError::Invalid(format!("Enter the {}-digit code", OTP_LENGTH));
            self.error = Some(err.user_message());
            return Err(err);
        }
        self.verify_guard.try_begin()?;
        self.error = None;
        Ok(VerifyOtpRequest {
            email: self.email.clone(),
            otp: self.code.clone(),
        })
    }

    pub fn finish_verify(
        &mut self,
        outcome: ApiResult<VerifyOtpResponse>,
    ) -> Result<VerifyOtpResponse, FlowError> {
        self.verify_guard.settle();
        outcome.map_err(|e| {
            log::warn!("OTP verification for {} failed: {}", self.email, e);
            self.error = Some(e.user_message());
            FlowError::Api(e)
        })
    }

    pub async fn verify(&mut self, backend: &dyn Backend) -> Result<VerifyOtpResponse, FlowError> {
        let request = self.begin_verify()?;
        let outcome = match self.purpose {
            OtpPurpose::VerifyEmail => backend.verify_email_otp(&request).await,
            OtpPurpose::ForgotPassword => backend.verify_forgot_password_otp(&request).await,
        };
        self.finish_verify(outcome)
    }

    pub fn begin_resend(&mut self, now: DateTime<Utc>) -> Result<EmailRequest, FlowError> {
        let wait = self.seconds_until_resend(now);
        if wait > 0 {
            return Err(FlowError::Cooldown(wait));
        }
        self.resend_guard.try_begin()?;
        Ok(EmailRequest {
            email: self.email.clone(),
        })
    }

    /// A new code restarts the cooldown and clears what was typed.
    pub fn finish_resend(
        &mut self,
        outcome: ApiResult<MessageResponse>,
        now: DateTime<Utc>,
    ) -> Result<(), FlowError> {
        self.resend_guard.settle();
        match outcome {
            Ok(response) => {
                self.last_sent = now;
                self.code.clear();
                self.error = None;
                self.notice = Some(
                    response
                        .message
                        .unwrap_or_else(|| format!("A new code was sent to {}", self.email)),
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("Resending OTP to {} failed: {}", self.email, e);
                self.error = Some(e.user_message());
                Err(FlowError::Api(e))
            }
        }
    }

    pub async fn resend(&mut self, backend: &dyn Backend, now: DateTime<Utc>) -> Result<(), FlowError> {
        let request = self.begin_resend(now)?;
        let outcome = match self.purpose {
            OtpPurpose::VerifyEmail => backend.resend_email_otp(&request).await,
            OtpPurpose::ForgotPassword => backend.request_forgot_password_otp(&request).await,
        };
        self.finish_resend(outcome, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeBackend, VALID_OTP};
    use chrono::Duration;

    #[test]
    fn code_input_is_sanitised() {
        let mut form = VerifyOtpForm::new("a@b.co", OtpPurpose::VerifyEmail, Utc::now());
        form.set_code("12 3-45678");
        assert_eq!(form.code(), "123456");
        assert!(form.is_complete());
    }

    #[test]
    fn resend_counts_down_from_sixty_seconds() {
        let sent = Utc::now();
        let form = VerifyOtpForm::new("a@b.co", OtpPurpose::VerifyEmail, sent);
        assert_eq!(form.seconds_until_resend(sent), 60);
        assert_eq!(form.seconds_until_resend(sent + Duration::seconds(45)), 15);
        assert_eq!(form.seconds_until_resend(sent + Duration::seconds(90)), 0);
        assert!(form.can_resend(sent + Duration::seconds(60)));
    }

    #[actix_web::test]
    async fn resend_is_refused_during_the_cooldown() {
        let backend = FakeBackend::new();
        let sent = Utc::now();
        let mut form = VerifyOtpForm::new("a@b.co", OtpPurpose::VerifyEmail, sent);

        let early = form.resend(&backend, sent + Duration::seconds(10)).await;
        assert!(matches!(early, Err(FlowError::Cooldown(50))));
        assert!(backend.calls().is_empty());

        let later = sent + Duration::seconds(61);
        form.set_code("123");
        form.resend(&backend, later).await.unwrap();
        assert_eq!(backend.calls(), vec!["resend_email_otp"]);
        assert_eq!(form.code(), "");
        assert_eq!(form.seconds_until_resend(later), 60);
    }

    #[actix_web::test]
    async fn incomplete_code_is_not_sent() {
        let backend = FakeBackend::new();
        let mut form = VerifyOtpForm::new("a@b.co", OtpPurpose::VerifyEmail, Utc::now());
        form.set_code("12");
        assert!(matches!(form.verify(&backend).await, Err(FlowError::Invalid(_))));
        assert!(backend.calls().is_empty());
    }

    #[actix_web::test]
    async fn wrong_code_surfaces_the_backend_message() {
        let backend = FakeBackend::new();
        let mut form = VerifyOtpForm::new("a@b.co", OtpPurpose::ForgotPassword, Utc::now());
        form.set_code("000000");
        assert!(form.verify(&backend).await.is_err());
        assert_eq!(form.error(), Some("Invalid OTP"));

        form.set_code(VALID_OTP);
        let response = form.verify(&backend).await.unwrap();
        assert!(response.token.is_some());
        assert_eq!(
            backend.calls(),
            vec!["verify_forgot_password_otp", "verify_forgot_password_otp"]
        );
    }
}
