//! Reading-status definitions.

use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::{keys, Binding, LocalStorage};
use crate::types::bookmark::Bookmark;
use crate::types::errors::StatusError;
use crate::types::status::ReadingStatus;

/// Color given to statuses created without one.
pub const DEFAULT_STATUS_COLOR: &str = "#888888";

/// Trait defining reading-status operations.
pub trait StatusManagerTrait {
    fn add_status(
        &mut self,
        label: &str,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> Result<ReadingStatus, StatusError>;

    fn update_status(
        &mut self,
        id: &str,
        label: &str,
        color: &str,
        icon: Option<&str>,
    ) -> Result<(), StatusError>;

    /// Deletes a status nobody uses.
    ///
    /// # Errors
    /// Returns [`StatusError::InUse`] when any bookmark references the status;
    /// nothing is changed in that case.
    fn delete_status(&mut self, id: &str, bookmarks: &[Bookmark]) -> Result<ReadingStatus, StatusError>;
}

pub struct StatusManager {
    statuses: Binding<Vec<ReadingStatus>>,
}

impl StatusManager {
    /// Binds the status list, seeding the defaults on first run.
    pub fn new(storage: &LocalStorage) -> Self {
        Self {
            statuses: Binding::bind(storage, keys::READING_STATUSES, ReadingStatus::defaults()),
        }
    }

    pub fn statuses(&self) -> &[ReadingStatus] {
        self.statuses.get()
    }

    pub fn get(&self, id: &str) -> Option<&ReadingStatus> {
        self.statuses().iter().find(|s| s.id == id)
    }

    pub fn replace_all(&mut self, statuses: Vec<ReadingStatus>) -> Result<(), StatusError> {
        self.statuses.set(statuses)?;
        Ok(())
    }

    pub fn sync(&mut self) -> bool {
        self.statuses.sync()
    }

    pub fn reload(&mut self) {
        self.statuses.reload();
    }
}

impl StatusManagerTrait for StatusManager {
    fn add_status(
        &mut self,
        label: &str,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> Result<ReadingStatus, StatusError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(StatusError::EmptyLabel);
        }
        let status = ReadingStatus {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            color: color.unwrap_or(DEFAULT_STATUS_COLOR).to_string(),
            icon: icon.filter(|i| !i.is_empty()).map(str::to_string),
        };
        let added = status.clone();
        self.statuses.update(|current| {
            let mut next = current.clone();
            next.push(added);
            next
        })?;
        info!(id = %status.id, label = %status.label, "reading status added");
        Ok(status)
    }

    fn update_status(
        &mut self,
        id: &str,
        label: &str,
        color: &str,
        icon: Option<&str>,
    ) -> Result<(), StatusError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(StatusError::EmptyLabel);
        }
        let mut list = self.statuses().to_vec();
        let status = list
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StatusError::NotFound(id.to_string()))?;
        status.label = label.to_string();
        status.color = color.to_string();
        status.icon = icon.filter(|i| !i.is_empty()).map(str::to_string);
        self.statuses.set(list)?;
        Ok(())
    }

    fn delete_status(&mut self, id: &str, bookmarks: &[Bookmark]) -> Result<ReadingStatus, StatusError> {
        let status = self
            .get(id)
            .cloned()
            .ok_or_else(|| StatusError::NotFound(id.to_string()))?;

        let count = bookmarks.iter().filter(|b| b.status_id == id).count();
        if count > 0 {
            warn!(%id, count, "refusing to delete a reading status in use");
            return Err(StatusError::InUse {
                label: status.label,
                count,
            });
        }

        let remaining: Vec<ReadingStatus> = self
            .statuses()
            .iter()
            .filter(|s| s.id != id)
            .cloned()
            .collect();
        self.statuses.set(remaining)?;
        info!(%id, "reading status deleted");
        Ok(status)
    }
}
