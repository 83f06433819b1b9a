// MangaMarks application facade
// Owns one tab's view of every store and implements the operations that
// span more than one of them: the status guard, the folder cascade,
// backup import/export, auto-backup, the dashboard and the app reset.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::bookmark_view::{self, DashboardStats};
use crate::managers::folder_manager::{FolderManager, FolderManagerTrait};
use crate::managers::preset_manager::{PresetManager, PresetManagerTrait};
use crate::managers::status_manager::{StatusManager, StatusManagerTrait};
use crate::managers::tracking::Tracking;
use crate::platform;
use crate::services::auth_lock::{AuthLock, AuthLockTrait};
use crate::services::backup_service::{parse_backup_json, BackupService, BackupServiceTrait};
use crate::services::clock::{Clock, SystemClock};
use crate::services::crypto_service::CryptoService;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::storage::binding::read_value;
use crate::storage::{codec, keys, LocalStorage, StorageArea};
use crate::types::activity::ActivityLogEntry;
use crate::types::backup::{BackupData, ImportSummary};
use crate::types::bookmark::{Bookmark, BookmarkDraft, Folder, SaveOutcome};
use crate::types::errors::{AppError, BackupError, FolderError, PresetError, StorageError};
use crate::types::preset::{SortPreset, ViewSettings};
use crate::types::status::ReadingStatus;

/// Central application struct holding every store of one tab.
pub struct MangaMarks {
    pub storage: LocalStorage,
    pub clock: Arc<dyn Clock>,
    pub settings_engine: SettingsEngine,
    pub bookmarks: BookmarkManager,
    pub statuses: StatusManager,
    pub folders: FolderManager,
    pub presets: PresetManager,
    pub tracking: Tracking,
    pub auth: AuthLock,
    pub backup: BackupService,
}

impl MangaMarks {
    /// Loads settings and opens the SQLite store in the platform data directory.
    ///
    /// # Errors
    /// Returns an error if the settings file is malformed or the database
    /// cannot be opened.
    pub fn open(mut settings_engine: SettingsEngine) -> Result<Self, AppError> {
        let settings = settings_engine.load()?;

        let data_dir = platform::get_data_dir();
        fs::create_dir_all(&data_dir).map_err(|e| {
            StorageError::Database(format!("Failed to create data directory: {}", e))
        })?;
        let db_path = data_dir.join(&settings.storage.database_file);
        let db = Database::open(&db_path).map_err(StorageError::from)?;
        info!(path = %db_path.display(), "database opened");

        let area = StorageArea::sqlite(db);
        Ok(Self::with_storage(
            &area.open_tab(),
            Arc::new(SystemClock),
            settings_engine,
        ))
    }

    /// Builds the stores on an existing tab using the engine's current settings.
    pub fn with_storage(
        storage: &LocalStorage,
        clock: Arc<dyn Clock>,
        settings_engine: SettingsEngine,
    ) -> Self {
        let security = settings_engine.get_settings().security.clone();
        let crypto = CryptoService::with_iterations(security.pin_hash_iterations);

        Self {
            storage: storage.clone(),
            bookmarks: BookmarkManager::new(storage, Arc::clone(&clock)),
            statuses: StatusManager::new(storage),
            folders: FolderManager::new(storage),
            presets: PresetManager::new(storage),
            tracking: Tracking::new(storage, Arc::clone(&clock)),
            auth: AuthLock::new(
                storage,
                crypto.clone(),
                Duration::from_secs(security.inactivity_timeout_secs),
                security.min_pin_length,
            ),
            backup: BackupService::new(crypto),
            settings_engine,
            clock,
        }
    }

    /// Rolls summaries over, arms the inactivity timer and writes a due auto-backup.
    pub fn startup(&mut self) -> Result<(), AppError> {
        self.tracking.reconcile()?;
        self.auth.start_idle_timer();
        if let Err(e) = self.maybe_auto_backup() {
            warn!(error = %e, "auto-backup failed");
        }
        info!(
            bookmarks = self.bookmarks.bookmarks().len(),
            locked = self.auth.is_locked(),
            "MangaMarks started"
        );
        Ok(())
    }

    /// Applies changes other tabs made since the last call. Returns whether
    /// anything was re-read.
    pub fn sync(&mut self) -> Result<bool, AppError> {
        let bookmarks = self.bookmarks.sync();
        let statuses = self.statuses.sync();
        let folders = self.folders.sync();
        let presets = self.presets.sync();
        let tracking = self.tracking.sync();
        self.tracking.reconcile()?;
        Ok(bookmarks || statuses || folders || presets || tracking)
    }

    /// Re-reads every store from storage.
    pub fn reload(&mut self) {
        self.bookmarks.reload();
        self.statuses.reload();
        self.folders.reload();
        self.presets.reload();
        self.tracking.reload();
    }

    // --- Bookmarks ---

    pub fn save_bookmark(
        &mut self,
        draft: BookmarkDraft,
        id: Option<&str>,
    ) -> Result<SaveOutcome, AppError> {
        Ok(self
            .bookmarks
            .add_or_update(draft, id, self.statuses.statuses(), &mut self.tracking)?)
    }

    pub fn update_chapter(&mut self, id: &str, chapter: f64) -> Result<(), AppError> {
        Ok(self
            .bookmarks
            .update_chapter(id, chapter, self.statuses.statuses(), &mut self.tracking)?)
    }

    pub fn revert_bookmark(&mut self, id: &str, history_date: DateTime<Utc>) -> Result<(), AppError> {
        Ok(self.bookmarks.revert(
            id,
            history_date,
            self.statuses.statuses(),
            self.folders.folders(),
            &mut self.tracking,
        )?)
    }

    pub fn delete_bookmarks(&mut self, ids: &[String]) -> Result<usize, AppError> {
        Ok(self.bookmarks.delete(ids, &mut self.tracking)?)
    }

    pub fn undo_delete(&mut self) -> Result<usize, AppError> {
        Ok(self.bookmarks.undo_delete(
            self.statuses.statuses(),
            self.folders.folders(),
            &mut self.tracking,
        )?)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool, AppError> {
        Ok(self.bookmarks.toggle_favorite(id, &mut self.tracking)?)
    }

    pub fn toggle_pinned(&mut self, id: &str) -> Result<bool, AppError> {
        Ok(self.bookmarks.toggle_pinned(id, &mut self.tracking)?)
    }

    pub fn set_bookmark_status(&mut self, ids: &[String], status_id: &str) -> Result<usize, AppError> {
        Ok(self
            .bookmarks
            .update_status(ids, status_id, self.statuses.statuses(), &mut self.tracking)?)
    }

    /// Moves bookmarks into `folder_id`, or out of any folder when `None`.
    ///
    /// # Errors
    /// Returns [`FolderError::NotFound`] for an unknown folder.
    pub fn move_to_folder(&mut self, ids: &[String], folder_id: Option<&str>) -> Result<usize, AppError> {
        let folder = match folder_id {
            Some(id) => Some(
                self.folders
                    .get(id)
                    .cloned()
                    .ok_or_else(|| FolderError::NotFound(id.to_string()))?,
            ),
            None => None,
        };
        Ok(self
            .bookmarks
            .move_to_folder(ids, folder.as_ref(), &mut self.tracking)?)
    }

    pub fn reorder(&mut self, ordered_ids: &[String]) -> Result<(), AppError> {
        Ok(self.bookmarks.reorder(ordered_ids)?)
    }

    pub fn dismiss_reminder(&mut self, id: &str) -> Result<(), AppError> {
        Ok(self.bookmarks.dismiss_reminder(id)?)
    }

    // --- Statuses, folders, presets ---

    pub fn add_status(
        &mut self,
        label: &str,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> Result<ReadingStatus, AppError> {
        Ok(self.statuses.add_status(label, color, icon)?)
    }

    pub fn update_status(
        &mut self,
        id: &str,
        label: &str,
        color: &str,
        icon: Option<&str>,
    ) -> Result<(), AppError> {
        Ok(self.statuses.update_status(id, label, color, icon)?)
    }

    /// Deletes a status, refusing while any bookmark still uses it.
    pub fn delete_status(&mut self, id: &str) -> Result<ReadingStatus, AppError> {
        Ok(self.statuses.delete_status(id, self.bookmarks.bookmarks())?)
    }

    pub fn add_folder(&mut self, name: &str) -> Result<Folder, AppError> {
        Ok(self.folders.add_folder(name)?)
    }

    pub fn rename_folder(&mut self, id: &str, name: &str) -> Result<(), AppError> {
        Ok(self.folders.rename_folder(id, name)?)
    }

    /// Deletes a folder and detaches its bookmarks. Returns how many
    /// bookmarks were detached; none are deleted.
    pub fn delete_folder(&mut self, id: &str) -> Result<usize, AppError> {
        if self.folders.get(id).is_none() {
            return Err(FolderError::NotFound(id.to_string()).into());
        }
        let detached = self.bookmarks.clear_folder(id)?;
        let folder = self.folders.delete_folder(id)?;
        info!(folder = %folder.name, detached, "folder deleted");
        Ok(detached)
    }

    pub fn save_preset(&mut self, name: &str, settings: ViewSettings) -> Result<SortPreset, AppError> {
        Ok(self.presets.save_preset(name, settings)?)
    }

    pub fn rename_preset(&mut self, id: &str, name: &str) -> Result<(), AppError> {
        Ok(self.presets.rename_preset(id, name)?)
    }

    pub fn delete_preset(&mut self, id: &str) -> Result<(), AppError> {
        Ok(self.presets.delete_preset(id)?)
    }

    /// View settings stored in preset `id`.
    pub fn apply_preset(&self, id: &str) -> Result<ViewSettings, AppError> {
        self.presets
            .get(id)
            .map(|p| p.settings.clone())
            .ok_or_else(|| PresetError::NotFound(id.to_string()).into())
    }

    // --- Views ---

    pub fn visible_bookmarks(&self, settings: &ViewSettings) -> Vec<Bookmark> {
        bookmark_view::visible(self.bookmarks.bookmarks(), settings)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all_tags(&self) -> Vec<String> {
        bookmark_view::all_tags(self.bookmarks.bookmarks())
    }

    pub fn due_reminders(&self) -> Vec<Bookmark> {
        bookmark_view::due_reminders(self.bookmarks.bookmarks(), self.clock.now())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn dashboard(&self) -> DashboardStats {
        bookmark_view::dashboard(
            self.bookmarks.bookmarks(),
            self.statuses.statuses(),
            self.tracking.streak.count(),
            self.tracking.weekly.current(),
            self.tracking.daily.current(),
        )
    }

    // --- Activity log ---

    pub fn activity_log(&self) -> &[ActivityLogEntry] {
        self.tracking.activity.entries()
    }

    /// Local calendar days with recorded activity, earliest first.
    pub fn activity_days(&self) -> Vec<NaiveDate> {
        self.tracking.activity.activity_days()
    }

    /// Activity recorded on the local calendar day `day`, newest first.
    pub fn activity_on(&self, day: NaiveDate) -> Vec<&ActivityLogEntry> {
        self.tracking.activity.activity_on(day)
    }

    /// Empties the activity log.
    ///
    /// # Errors
    /// Returns [`AppError::ConfirmationRequired`] unless `confirmed` is set.
    pub fn clear_activity_log(&mut self, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            return Err(AppError::ConfirmationRequired("clear the activity log"));
        }
        Ok(self.tracking.activity.clear()?)
    }

    // --- Backup ---

    /// Current contents of every collection, in export form.
    pub fn snapshot(&self) -> BackupData {
        BackupData {
            bookmarks: self.bookmarks.bookmarks().to_vec(),
            reading_statuses: self.statuses.statuses().to_vec(),
            sort_presets: Some(self.presets.presets().to_vec()),
            folders: Some(self.folders.folders().to_vec()),
            activity_log: Some(self.tracking.activity.entries().to_vec()),
        }
    }

    /// Serializes every collection, encrypted when `passphrase` is non-empty.
    ///
    /// # Errors
    /// Returns [`BackupError::Empty`] when there are no bookmarks.
    pub fn export_backup(&self, passphrase: Option<&str>) -> Result<String, AppError> {
        if self.bookmarks.bookmarks().is_empty() {
            return Err(BackupError::Empty.into());
        }
        let text = self.backup.export(&self.snapshot(), passphrase)?;
        info!(
            bookmarks = self.bookmarks.bookmarks().len(),
            encrypted = passphrase.is_some_and(|p| !p.is_empty()),
            "backup exported"
        );
        Ok(text)
    }

    /// Replaces the stored collections with the backup's.
    ///
    /// The import is all or nothing: a document that fails validation
    /// changes nothing, and a storage failure part-way through restores the
    /// previous collections.
    pub fn import_backup(&mut self, text: &str, passphrase: Option<&str>) -> Result<ImportSummary, AppError> {
        let data = self.backup.parse(text, passphrase)?;
        self.apply_backup(data)
    }

    /// When of the last automatic backup, if any.
    pub fn last_auto_backup(&self) -> Option<DateTime<Utc>> {
        let millis: Option<i64> = read_value(&self.storage, keys::AUTOBACKUP_TIMESTAMP, &None);
        millis.and_then(DateTime::from_timestamp_millis)
    }

    /// Writes an automatic backup when enabled, bookmarks exist and the
    /// configured interval has passed. Returns whether one was written.
    pub fn maybe_auto_backup(&mut self) -> Result<bool, AppError> {
        let backup = &self.settings_engine.get_settings().backup;
        if !backup.auto_backup_enabled || self.bookmarks.bookmarks().is_empty() {
            return Ok(false);
        }

        let now = self.clock.now();
        let interval = chrono::Duration::days(i64::from(backup.auto_backup_interval_days));
        if let Some(last) = self.last_auto_backup() {
            if now - last < interval {
                debug!(%last, "auto-backup not due yet");
                return Ok(false);
            }
        }

        self.storage
            .set_item(keys::AUTOBACKUP, &codec::encode(&self.snapshot())?)?;
        self.storage.set_item(
            keys::AUTOBACKUP_TIMESTAMP,
            &codec::encode(&now.timestamp_millis())?,
        )?;
        info!(bookmarks = self.bookmarks.bookmarks().len(), "auto-backup written");
        Ok(true)
    }

    /// Imports the last automatic backup.
    ///
    /// # Errors
    /// Returns [`BackupError::NoAutoBackup`] when none was written yet.
    pub fn restore_auto_backup(&mut self) -> Result<ImportSummary, AppError> {
        let stored: Option<BackupData> = read_value(&self.storage, keys::AUTOBACKUP, &None);
        let data = stored.ok_or(BackupError::NoAutoBackup)?;
        let json = serde_json::to_string(&data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let data = parse_backup_json(&json)?;
        self.apply_backup(data)
    }

    fn apply_backup(&mut self, data: BackupData) -> Result<ImportSummary, AppError> {
        let previous = self.snapshot();
        match self.write_collections(&data) {
            Ok(summary) => {
                info!(
                    bookmarks = summary.bookmarks,
                    statuses = summary.reading_statuses,
                    "backup imported"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "import failed, restoring previous data");
                if let Err(rollback) = self.write_collections(&previous) {
                    warn!(error = %rollback, "failed to restore previous data");
                }
                Err(e)
            }
        }
    }

    fn write_collections(&mut self, data: &BackupData) -> Result<ImportSummary, AppError> {
        self.statuses.replace_all(data.reading_statuses.clone())?;
        let mut bookmarks = data.bookmarks.clone();
        if data.folders.is_none() {
            let live = self.folders.folders();
            for bookmark in bookmarks.iter_mut() {
                let known = bookmark
                    .folder_id
                    .as_deref()
                    .map_or(true, |id| live.iter().any(|f| f.id == id));
                if !known {
                    bookmark.folder_id = None;
                }
            }
        }
        self.bookmarks.replace_all(bookmarks)?;

        let sort_presets = match &data.sort_presets {
            Some(presets) => {
                self.presets.replace_all(presets.clone())?;
                Some(presets.len())
            }
            None => None,
        };
        let folders = match &data.folders {
            Some(folders) => {
                self.folders.replace_all(folders.clone())?;
                Some(folders.len())
            }
            None => None,
        };
        let activity_log = match &data.activity_log {
            Some(entries) => {
                self.tracking.activity.replace(entries.clone())?;
                Some(self.tracking.activity.entries().len())
            }
            None => None,
        };

        Ok(ImportSummary {
            bookmarks: data.bookmarks.len(),
            reading_statuses: data.reading_statuses.len(),
            sort_presets,
            folders,
            activity_log,
        })
    }

    // --- Reset ---

    /// Erases every key of the application and starts over from defaults.
    /// Returns how many keys were removed.
    ///
    /// # Errors
    /// Returns [`AppError::ConfirmationRequired`] unless `confirmed` is set.
    pub fn reset_app(&mut self, confirmed: bool) -> Result<usize, AppError> {
        if !confirmed {
            return Err(AppError::ConfirmationRequired("erase all application data"));
        }
        let removed = self.auth.reset_app()?;
        self.reload();
        Ok(removed)
    }
}
