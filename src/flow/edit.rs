//! Editing an existing record: hydrated from the backend, entered directly
//! at the style stage, always saved as a full update.

use std::ops::{Deref, DerefMut};

use crate::client::Backend;
use crate::flow::stage::StyleStage;
use crate::flow::FlowError;
use crate::models::qr_record::QrRecord;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct EditFlow {
    stage: StyleStage,
}

impl EditFlow {
    pub fn hydrate(record: QrRecord) -> Self {
        Self {
            stage: StyleStage::from_record(record),
        }
    }

    pub async fn load(
        backend: &dyn Backend,
        session: &Session,
        id: &str,
    ) -> Result<Self, FlowError> {
        let record = backend.get_qr(&session.token, id).await.map_err(|e| {
            log::warn!("Loading QR code {} for editing failed: {}", id, e);
            FlowError::Api(e)
        })?;
        Ok(Self::hydrate(record))
    }
}

impl Deref for EditFlow {
    type Target = StyleStage;

    fn deref(&self) -> &StyleStage {
        &self.stage
    }
}

impl DerefMut for EditFlow {
    fn deref_mut(&mut self) -> &mut StyleStage {
        &mut self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::flow::Route;
    use crate::models::payload::{QrPayload, UrlPayload};
    use crate::models::qr_record::sample_record;
    use crate::models::style::{DotShape, FillTarget};
    use crate::utils::jwt::mint_token;
    use chrono::Utc;

    fn session() -> Session {
        Session::from_token(&mint_token("owner", Some(Utc::now().timestamp() + 600)), Utc::now())
            .unwrap()
    }

    #[actix_web::test]
    async fn load_hydrates_every_field() {
        let backend = FakeBackend::new();
        let mut record = sample_record("qr-9", "nine", true);
        record.name = Some("Poster".into());
        record.style.set_shape(FillTarget::Dots, DotShape::Rounded);
        backend.insert(record.clone());

        let flow = EditFlow::load(&backend, &session(), "qr-9").await.unwrap();
        assert_eq!(flow.name(), "Poster");
        assert_eq!(flow.style(), &record.style);
        assert_eq!(flow.payload(), &record.payload);
    }

    #[actix_web::test]
    async fn missing_record_is_an_api_error() {
        let backend = FakeBackend::new();
        let result = EditFlow::load(&backend, &session(), "nope").await;
        assert!(matches!(result, Err(FlowError::Api(_))));
    }

    #[actix_web::test]
    async fn save_submits_the_full_record() {
        let backend = FakeBackend::new();
        backend.insert(sample_record("qr-1", "one", true));
        let mut flow = EditFlow::load(&backend, &session(), "qr-1").await.unwrap();

        flow.set_name("Renamed");
        flow.edit_payload(QrPayload::Url(UrlPayload {
            url: "https://example.com/new".into(),
        }))
        .unwrap();
        let route = flow.save(&backend, &session()).await.unwrap();

        assert_eq!(route, Route::QrDetail { id: "qr-1".into() });
        let saved = backend.record("qr-1").unwrap();
        assert_eq!(saved.name.as_deref(), Some("Renamed"));
        assert_eq!(saved.payload.encode(), "https://example.com/new");
        assert_eq!(flow.record(), &saved);
    }
}
