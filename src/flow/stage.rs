//! The style stage shared by the create and edit flows.

use crate::client::{ApiResult, Backend};
use crate::flow::submit::SubmitGuard;
use crate::flow::{FlowError, Route, validation_message};
use crate::models::payload::QrPayload;
use crate::models::qr_record::QrRecord;
use crate::models::style::StyleConfig;
use crate::render::RenderOptions;
use crate::session::Session;
use crate::structs::qr_request::UpdateQrRequest;

/// Editable copy of a saved record. The record itself is only replaced by
/// the backend's canonical response.
#[derive(Debug, Clone)]
pub struct StyleStage {
    record: QrRecord,
    name: String,
    payload: QrPayload,
    style: StyleConfig,
    guard: SubmitGuard,
    error: Option<String>,
}

impl StyleStage {
    pub fn from_record(record: QrRecord) -> Self {
        Self {
            name: record.name.clone().unwrap_or_default(),
            payload: record.payload.clone(),
            style: record.style.clone(),
            record,
            guard: SubmitGuard::new(),
            error: None,
        }
    }

    pub fn record(&self) -> &QrRecord {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn payload(&self) -> &QrPayload {
        &self.payload
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleConfig {
        &mut self.style
    }

    /// Static codes have their payload printed into the symbol.
    pub fn payload_editable(&self) -> bool {
        self.record.payload_editable()
    }

    pub fn edit_payload(&mut self, payload: QrPayload) -> Result<(), FlowError> {
        if !self.payload_editable() {
            return Err(FlowError::PayloadLocked);
        }
        if payload.content_type() != self.record.content_type() {
            return Err(FlowError::Invalid(format!(
                "Content must stay of type {}",
                self.record.content_type()
            )));
        }
        self.payload = payload;
        Ok(())
    }

    pub(crate) fn payload_mut(&mut self) -> Result<&mut QrPayload, FlowError> {
        if !self.payload_editable() {
            return Err(FlowError::PayloadLocked);
        }
        Ok(&mut self.payload)
    }

    /// String encoded by the live preview.
    pub fn preview_data(&self, origin: &str) -> String {
        if self.record.is_dynamic {
            self.record.dynamic_url(origin)
        } else {
            self.payload.encode()
        }
    }

    pub fn render_options(&self, origin: &str, size: u32, margin: u32) -> RenderOptions {
        RenderOptions::new(self.preview_data(origin), size, margin, self.style.clone())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting()
    }

    /// Full update request, checked locally first.
    pub fn update_request(&self) -> Result<UpdateQrRequest, FlowError> {
        let violations = self.style.validate();
        if !violations.is_empty() {
            return Err(FlowError::InvalidStyle(violations));
        }
        self.payload
            .validate()
            .map_err(|e| FlowError::Invalid(validation_message(&e)))?;
        Ok(UpdateQrRequest {
            name: self.name.trim().to_string(),
            payload: self.payload.clone(),
            style: self.style.clone(),
        })
    }

    pub fn begin_save(&mut self) -> Result<(String, UpdateQrRequest), FlowError> {
        let request = match self.update_request() {
            Ok(request) => request,
            Err(e) => {
                self.error = Some(e.user_message());
                return Err(e);
            }
        };
        self.guard.try_begin()?;
        self.error = None;
        Ok((self.record.id.clone(), request))
    }

    /// Failure keeps every edited value for a retry.
    pub fn finish_save(&mut self, outcome: ApiResult<QrRecord>) -> Result<Route, FlowError> {
        self.guard.settle();
        match outcome {
            Ok(record) => {
                log::info!("Saved QR code {}", record.id);
                *self = Self::from_record(record);
                Ok(Route::QrDetail {
                    id: self.record.id.clone(),
                })
            }
            Err(e) => {
                log::warn!("Saving QR code {} failed: {}", self.record.id, e);
                self.error = Some(e.user_message());
                Err(FlowError::Api(e))
            }
        }
    }

    pub async fn save(
        &mut self,
        backend: &dyn Backend,
        session: &Session,
    ) -> Result<Route, FlowError> {
        let (id, request) = self.begin_save()?;
        let outcome = backend.update_qr(&session.token, &id, &request).await;
        self.finish_save(outcome)
    }
}
