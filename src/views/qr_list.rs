use std::collections::HashSet;

use crate::client::Backend;
use crate::models::qr_record::QrRecord;
use crate::session::SessionContext;
use crate::views::{DeleteConfirmation, ViewError};

/// The signed-in user's QR codes.
#[derive(Debug, Default)]
pub struct QrListView {
    records: Vec<QrRecord>,
    filter: String,
    loaded: bool,
    error: Option<String>,
    pausing: HashSet<String>,
    deleting: HashSet<String>,
}

impl QrListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(
        &mut self,
        backend: &dyn Backend,
        session: &SessionContext,
    ) -> Result<(), ViewError> {
        let session = session.require()?;
        match backend.list_user_qrs(&session.token).await {
            Ok(records) => {
                log::debug!("Loaded {} QR codes", records.len());
                self.records = records;
                self.loaded = true;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("Loading QR codes failed: {}", e);
                self.error = Some(e.user_message());
                Err(ViewError::Api(e))
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn records(&self) -> &[QrRecord] {
        &self.records
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Records whose label contains the filter, ignoring case.
    pub fn visible(&self) -> Vec<&QrRecord> {
        filter_records(&self.records, &self.filter)
    }

    fn find(&self, id: &str) -> Result<&QrRecord, ViewError> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| ViewError::NotFound(id.to_string()))
    }

    pub fn confirm_delete(&self, id: &str) -> Result<DeleteConfirmation, ViewError> {
        let record = self.find(id)?;
        Ok(DeleteConfirmation::new(&record.id, record.display_label()))
    }

    /// Removes the row only after the backend confirms.
    pub async fn delete(
        &mut self,
        backend: &dyn Backend,
        session: &SessionContext,
        confirmation: &DeleteConfirmation,
    ) -> Result<(), ViewError> {
        let session = session.require()?;
        let id = confirmation.id().to_string();
        let record = self.find(&id)?;
        if !confirmation.is_enabled() || confirmation.label() != record.display_label() {
            return Err(ViewError::ConfirmationMismatch);
        }
        if !self.deleting.insert(id.clone()) {
            return Err(ViewError::Busy);
        }

        let outcome = backend.delete_qr(&session.token, &id).await;
        self.deleting.remove(&id);
        match outcome {
            Ok(()) => {
                log::info!("Deleted QR code {}", id);
                self.records.retain(|record| record.id != id);
                Ok(())
            }
            Err(e) => {
                log::warn!("Deleting QR code {} failed: {}", id, e);
                self.error = Some(e.user_message());
                Err(ViewError::Api(e))
            }
        }
    }

    pub fn is_pausing(&self, id: &str) -> bool {
        self.pausing.contains(id)
    }

    /// Marks `id` as in flight. One toggle per record at a time.
    pub fn begin_toggle_pause(&mut self, id: &str) -> Result<(), ViewError> {
        if !self.find(id)?.can_pause() {
            return Err(ViewError::NotDynamic);
        }
        if !self.pausing.insert(id.to_string()) {
            return Err(ViewError::Busy);
        }
        Ok(())
    }

    /// Replaces the row with the backend's canonical record.
    pub fn finish_toggle_pause(
        &mut self,
        id: &str,
        outcome: crate::client::ApiResult<QrRecord>,
    ) -> Result<&QrRecord, ViewError> {
        self.pausing.remove(id);
        match outcome {
            Ok(updated) => {
                log::info!(
                    "QR code {} is now {}",
                    id,
                    if updated.is_paused { "paused" } else { "active" }
                );
                let index = self
                    .records
                    .iter()
                    .position(|record| record.id == id)
                    .ok_or_else(|| ViewError::NotFound(id.to_string()))?;
                self.records[index] = updated;
                Ok(&self.records[index])
            }
            Err(e) => {
                log::warn!("Toggling pause on {} failed: {}", id, e);
                self.error = Some(e.user_message());
                Err(ViewError::Api(e))
            }
        }
    }

    pub async fn toggle_pause(
        &mut self,
        backend: &dyn Backend,
        session: &SessionContext,
        id: &str,
    ) -> Result<&QrRecord, ViewError> {
        let session = session.require()?;
        self.begin_toggle_pause(id)?;
        let outcome = backend.toggle_pause(&session.token, id).await;
        self.finish_toggle_pause(id, outcome)
    }
}

/// Case-insensitive substring match on the display label.
pub fn filter_records<'a>(records: &'a [QrRecord], filter: &str) -> Vec<&'a QrRecord> {
    let needle = filter.trim().to_lowercase();
    records
        .iter()
        .filter(|record| needle.is_empty() || record.display_label().to_lowercase().contains(&needle))
        .collect()
}
