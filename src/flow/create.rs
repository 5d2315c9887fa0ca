//! QR creation: `SelectType → EnterPayload → Style → Saved`.

use crate::client::{ApiResult, Backend};
use crate::flow::stage::StyleStage;
use crate::flow::submit::SubmitGuard;
use crate::flow::{FlowError, Route, validation_message};
use crate::models::payload::{ContentType, QrPayload};
use crate::models::qr_record::QrRecord;
use crate::session::Session;
use crate::structs::qr_request::{CreateQrRequest, UpdateQrRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    SelectType,
    EnterPayload,
    Style,
    Saved,
}

#[derive(Debug)]
pub struct CreateFlow {
    step: CreateStep,
    payload: Option<QrPayload>,
    is_dynamic: bool,
    stage: Option<StyleStage>,
    guard: SubmitGuard,
    error: Option<String>,
}

impl Default for CreateFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateFlow {
    pub fn new() -> Self {
        Self {
            step: CreateStep::SelectType,
            payload: None,
            is_dynamic: true,
            stage: None,
            guard: SubmitGuard::new(),
            error: None,
        }
    }

    pub fn step(&self) -> CreateStep {
        self.step
    }

    /// Inputs are frozen while a request is in flight.
    fn ensure_idle(&self) -> Result<(), FlowError> {
        if self.guard.is_submitting() {
            return Err(FlowError::Busy);
        }
        Ok(())
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.payload.as_ref().map(QrPayload::content_type)
    }

    /// Choosing a type starts an empty payload; re-choosing the same type
    /// keeps what was typed.
    pub fn select_type(&mut self, content_type: ContentType) -> Result<(), FlowError> {
        self.ensure_idle()?;
        match self.step {
            CreateStep::SelectType | CreateStep::EnterPayload => {}
            _ => return Err(FlowError::WrongStep),
        }
        if self.content_type() != Some(content_type) {
            self.payload = Some(QrPayload::empty(content_type));
        }
        self.step = CreateStep::EnterPayload;
        self.error = None;
        Ok(())
    }

    /// Back to type selection from the payload form.
    pub fn back(&mut self) -> Result<(), FlowError> {
        self.ensure_idle()?;
        if self.step != CreateStep::EnterPayload {
            return Err(FlowError::WrongStep);
        }
        self.step = CreateStep::SelectType;
        Ok(())
    }

    pub fn payload(&self) -> Option<&QrPayload> {
        self.payload.as_ref()
    }

    /// Payload form state while entering content, or the stage's copy of a
    /// dynamic record afterwards.
    pub fn payload_mut(&mut self) -> Result<&mut QrPayload, FlowError> {
        self.ensure_idle()?;
        match self.step {
            CreateStep::EnterPayload => self.payload.as_mut().ok_or(FlowError::NoContentType),
            CreateStep::Style => self.stage_mut()?.payload_mut(),
            _ => Err(FlowError::WrongStep),
        }
    }

    pub fn edit_payload(&mut self, payload: QrPayload) -> Result<(), FlowError> {
        self.ensure_idle()?;
        match self.step {
            CreateStep::EnterPayload => {
                if Some(payload.content_type()) != self.content_type() {
                    return Err(FlowError::Invalid(
                        "Content does not match the selected type".to_string(),
                    ));
                }
                self.payload = Some(payload);
                Ok(())
            }
            CreateStep::Style => self.stage_mut()?.edit_payload(payload),
            _ => Err(FlowError::WrongStep),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Fixed once the record exists.
    pub fn set_dynamic(&mut self, is_dynamic: bool) -> Result<(), FlowError> {
        self.ensure_idle()?;
        if self.step != CreateStep::EnterPayload {
            return Err(FlowError::WrongStep);
        }
        self.is_dynamic = is_dynamic;
        Ok(())
    }

    pub fn begin_create(&mut self) -> Result<CreateQrRequest, FlowError> {
        if self.step != CreateStep::EnterPayload {
            return Err(FlowError::WrongStep);
        }
        let payload = self.payload.clone().ok_or(FlowError::NoContentType)?;
        if let Err(e) = payload.validate() {
            let err = FlowError::Invalid(validation_message(&e));
            self.error = Some(err.user_message());
            return Err(err);
        }
        self.guard.try_begin()?;
        self.error = None;
        Ok(CreateQrRequest {
            content_type: payload.content_type(),
            payload,
            is_dynamic: self.is_dynamic,
        })
    }

    /// On failure the flow stays at `EnterPayload` with the entered data.
    pub fn finish_create(&mut self, outcome: ApiResult<QrRecord>) -> Result<(), FlowError> {
        self.guard.settle();
        match outcome {
            Ok(record) => {
                log::info!("Created QR code {} ({})", record.id, record.short_code);
                self.stage = Some(StyleStage::from_record(record));
                self.step = CreateStep::Style;
                Ok(())
            }
            Err(e) => {
                log::warn!("Creating QR code failed: {}", e);
                self.error = Some(e.user_message());
                Err(FlowError::Api(e))
            }
        }
    }

    pub async fn create(
        &mut self,
        backend: &dyn Backend,
        session: &Session,
    ) -> Result<(), FlowError> {
        let request = self.begin_create()?;
        let outcome = backend.create_qr(&session.token, &request).await;
        self.finish_create(outcome)
    }

    pub fn stage(&self) -> Option<&StyleStage> {
        self.stage.as_ref()
    }

    pub fn stage_mut(&mut self) -> Result<&mut StyleStage, FlowError> {
        match self.step {
            CreateStep::Style => self.stage.as_mut().ok_or(FlowError::WrongStep),
            _ => Err(FlowError::WrongStep),
        }
    }

    pub fn begin_save(&mut self) -> Result<(String, UpdateQrRequest), FlowError> {
        self.stage_mut()?.begin_save()
    }

    pub fn finish_save(&mut self, outcome: ApiResult<QrRecord>) -> Result<Route, FlowError> {
        let route = self.stage_mut()?.finish_save(outcome)?;
        self.step = CreateStep::Saved;
        Ok(route)
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

    /// Data for the live preview: the payload itself before the record
    /// exists, the record's encoded data afterwards.
    pub fn preview_data(&self, origin: &str) -> Option<String> {
        match (&self.stage, &self.payload) {
            (Some(stage), _) => Some(stage.preview_data(origin)),
            (None, Some(payload)) => Some(payload.encode()).filter(|data| !data.is_empty()),
            (None, None) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.stage {
            Some(stage) if self.step != CreateStep::EnterPayload => stage.error(),
            _ => self.error.as_deref(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.guard.is_submitting() || self.stage.as_ref().is_some_and(StyleStage::is_submitting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::models::payload::UrlPayload;
    use crate::models::style::FillTarget;
    use crate::utils::jwt::mint_token;
    use chrono::Utc;

    const ORIGIN: &str = "https://qr.example.com";

    fn session() -> Session {
        Session::from_token(&mint_token("owner", Some(Utc::now().timestamp() + 600)), Utc::now())
            .unwrap()
    }

    fn url_flow(is_dynamic: bool) -> CreateFlow {
        let mut flow = CreateFlow::new();
        flow.select_type(ContentType::Url).unwrap();
        flow.edit_payload(QrPayload::Url(UrlPayload {
            url: "https://example.com/menu".into(),
        }))
        .unwrap();
        flow.set_dynamic(is_dynamic).unwrap();
        flow
    }

    #[actix_web::test]
    async fn dynamic_code_previews_the_redirect_url() {
        let backend = FakeBackend::new();
        let mut flow = url_flow(true);

        flow.create(&backend, &session()).await.unwrap();
        assert_eq!(flow.step(), CreateStep::Style);

        let record = flow.stage().unwrap().record().clone();
        assert_eq!(
            flow.preview_data(ORIGIN).unwrap(),
            format!("{}/qr/{}", ORIGIN, record.short_code)
        );
        assert!(flow.payload_mut().is_ok());
    }

    #[actix_web::test]
    async fn static_code_previews_the_payload_and_locks_it() {
        let backend = FakeBackend::new();
        let mut flow = url_flow(false);

        flow.create(&backend, &session()).await.unwrap();
        assert_eq!(flow.preview_data(ORIGIN).unwrap(), "https://example.com/menu");
        assert!(matches!(flow.payload_mut(), Err(FlowError::PayloadLocked)));
        assert!(matches!(
            flow.edit_payload(QrPayload::empty(ContentType::Url)),
            Err(FlowError::PayloadLocked)
        ));
    }

    #[actix_web::test]
    async fn failed_create_stays_on_the_payload_step() {
        let backend = FakeBackend::new();
        backend.fail_next(503, "Service unavailable");
        let mut flow = url_flow(true);

        let result = flow.create(&backend, &session()).await;
        assert!(matches!(result, Err(FlowError::Api(_))));
        assert_eq!(flow.step(), CreateStep::EnterPayload);
        assert_eq!(flow.error(), Some("Service unavailable"));
        assert!(flow.is_dynamic());
        assert_eq!(flow.payload().unwrap().encode(), "https://example.com/menu");

        flow.create(&backend, &session()).await.unwrap();
        assert_eq!(flow.step(), CreateStep::Style);
    }

    #[actix_web::test]
    async fn invalid_payload_never_reaches_the_backend() {
        let backend = FakeBackend::new();
        let mut flow = CreateFlow::new();
        flow.select_type(ContentType::Url).unwrap();

        let result = flow.create(&backend, &session()).await;
        assert!(matches!(result, Err(FlowError::Invalid(_))));
        assert!(backend.calls().is_empty());
        assert!(!flow.is_submitting());
    }

    #[actix_web::test]
    async fn save_navigates_to_the_detail_view() {
        let backend = FakeBackend::new();
        let mut flow = url_flow(true);
        flow.create(&backend, &session()).await.unwrap();

        let stage = flow.stage_mut().unwrap();
        stage.set_name("Lunch");
        stage.style_mut().toggle_gradient(FillTarget::Dots);

        let route = flow.save(&backend, &session()).await.unwrap();
        let id = flow.stage().unwrap().record().id.clone();
        assert_eq!(route, Route::QrDetail { id: id.clone() });
        assert_eq!(flow.step(), CreateStep::Saved);

        let saved = backend.record(&id).unwrap();
        assert_eq!(saved.name.as_deref(), Some("Lunch"));
        assert!(saved.style.dots.fill.is_gradient());
    }

    #[actix_web::test]
    async fn failed_save_keeps_the_style_step() {
        let backend = FakeBackend::new();
        let mut flow = url_flow(true);
        flow.create(&backend, &session()).await.unwrap();
        flow.stage_mut().unwrap().set_name("Draft");

        backend.fail_next(500, "Try later");
        assert!(flow.save(&backend, &session()).await.is_err());
        assert_eq!(flow.step(), CreateStep::Style);
        assert_eq!(flow.error(), Some("Try later"));
        assert_eq!(flow.stage().unwrap().name(), "Draft");
    }

    #[test]
    fn type_cannot_change_after_creation() {
        let mut flow = CreateFlow::new();
        assert!(matches!(flow.begin_create(), Err(FlowError::WrongStep)));
        flow.select_type(ContentType::Text).unwrap();
        flow.select_type(ContentType::Phone).unwrap();
        assert_eq!(flow.content_type(), Some(ContentType::Phone));
        flow.back().unwrap();
        assert_eq!(flow.step(), CreateStep::SelectType);
    }

    #[actix_web::test]
    async fn inputs_are_frozen_while_creating() {
        let backend = FakeBackend::new();
        let mut flow = url_flow(true);

        let request = flow.begin_create().unwrap();
        assert!(matches!(flow.set_dynamic(false), Err(FlowError::Busy)));
        assert!(matches!(flow.select_type(ContentType::Text), Err(FlowError::Busy)));
        assert!(matches!(
            flow.edit_payload(QrPayload::Url(UrlPayload {
                url: "https://example.com/other".into(),
            })),
            Err(FlowError::Busy)
        ));
        assert!(matches!(flow.payload_mut(), Err(FlowError::Busy)));
        assert!(matches!(flow.back(), Err(FlowError::Busy)));

        let outcome = backend.create_qr(&session().token, &request).await;
        flow.finish_create(outcome).unwrap();
        let record = flow.stage().unwrap().record();
        assert!(record.is_dynamic);
        assert_eq!(record.payload.encode(), "https://example.com/menu");
        assert!(flow.is_dynamic());
    }
}
