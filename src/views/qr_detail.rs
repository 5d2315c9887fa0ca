use crate::client::Backend;
use crate::models::analytics::UserAnalytics;
use crate::models::qr_record::QrRecord;
use crate::render::RenderOptions;
use crate::session::SessionContext;
use crate::views::ViewError;

/// One QR code with its scan numbers.
#[derive(Debug)]
pub struct QrDetailView {
    record: QrRecord,
    analytics: Option<UserAnalytics>,
    pausing: bool,
    error: Option<String>,
}

impl QrDetailView {
    pub fn new(record: QrRecord) -> Self {
        Self {
            record,
            analytics: None,
            pausing: false,
            error: None,
        }
    }

    /// The record is required; analytics are best effort.
    pub async fn load(
        backend: &dyn Backend,
        session: &SessionContext,
        id: &str,
    ) -> Result<Self, ViewError> {
        let session = session.require()?;
        let record = backend.get_qr(&session.token, id).await?;
        let mut view = Self::new(record);

        match backend.user_analytics(&session.token).await {
            Ok(analytics) => view.analytics = Some(analytics),
            Err(e) => log::warn!("Analytics for {} unavailable: {}", id, e),
        }
        Ok(view)
    }

    pub fn record(&self) -> &QrRecord {
        &self.record
    }

    pub fn analytics(&self) -> Option<&UserAnalytics> {
        self.analytics.as_ref()
    }

    /// Scans from the analytics summary, else the record's own counter.
    pub fn scan_count(&self) -> i64 {
        self.analytics
            .as_ref()
            .and_then(|analytics| analytics.scans_for(&self.record.id))
            .unwrap_or(self.record.scan_count)
    }

    pub fn preview_data(&self, origin: &str) -> String {
        self.record.encoded_data(origin)
    }

    pub fn render_options(&self, origin: &str, size: u32, margin: u32) -> RenderOptions {
        RenderOptions::new(
            self.preview_data(origin),
            size,
            margin,
            self.record.style.clone(),
        )
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_pausing(&self) -> bool {
        self.pausing
    }

    pub async fn toggle_pause(
        &mut self,
        backend: &dyn Backend,
        session: &SessionContext,
    ) -> Result<&QrRecord, ViewError> {
        let session = session.require()?;
        if !self.record.can_pause() {
            return Err(ViewError::NotDynamic);
        }
        if self.pausing {
            return Err(ViewError::Busy);
        }

        self.pausing = true;
        let outcome = backend.toggle_pause(&session.token, &self.record.id).await;
        self.pausing = false;

        match outcome {
            Ok(record) => {
                self.record = record;
                self.error = None;
                Ok(&self.record)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(ViewError::Api(e))
            }
        }
    }
}
