//! RPC method handler for the MangaMarks JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdin.
//! [`handle_method`] dispatches synchronous calls to the [`MangaMarks`]
//! facade; [`handle_extract`] runs the asynchronous metadata lookup.
//!
//! While the PIN lock is engaged only `ping` and the lock-screen methods
//! are served.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::MangaMarks;
use crate::services::auth_lock::AuthLockTrait;
use crate::services::backup_service::is_encrypted;
use crate::services::metadata_extractor::{extract_or_manual, guess_chapter_from_url, MetadataExtractor};
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::auth::ActivitySignal;
use crate::types::bookmark::BookmarkDraft;
use crate::types::preset::ViewSettings;

/// Error returned for data methods while the app is locked.
pub const LOCKED_ERROR: &str = "app is locked";

/// Methods served while the lock screen is up.
const LOCK_SCREEN_METHODS: [&str; 5] = [
    "auth.state",
    "auth.unlock",
    "auth.set_pin",
    "auth.reset",
    "auth.activity",
];

/// Reads and deserializes a required parameter.
fn param<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, String> {
    let value = params
        .get(key)
        .cloned()
        .ok_or_else(|| format!("missing {}", key))?;
    serde_json::from_value(value).map_err(|e| format!("invalid {}: {}", key, e))
}

/// Reads an optional parameter; absent and `null` are both `None`.
fn opt_param<T: DeserializeOwned>(params: &Value, key: &str) -> Result<Option<T>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| format!("invalid {}: {}", key, e)),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call to the facade.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<MangaMarks>, method: &str, params: &Value) -> Result<Value, String> {
    if method == "ping" {
        return Ok(json!({"pong": true}));
    }

    let mut a = app.lock().map_err(|e| e.to_string())?;
    if a.auth.is_locked() && !LOCK_SCREEN_METHODS.contains(&method) {
        return Err(LOCKED_ERROR.to_string());
    }

    match method {
        // ─── Auth ───
        "auth.state" => Ok(json!({
            "state": a.auth.state().name(),
            "locked": a.auth.is_locked(),
            "pinSet": a.auth.is_pin_set(),
            "lockEnabled": a.auth.is_lock_enabled(),
        })),
        "auth.set_pin" => {
            let pin: String = param(params, "pin")?;
            if a.auth.is_locked() && a.auth.is_pin_set() {
                return Err(LOCKED_ERROR.to_string());
            }
            a.auth.set_pin(&pin).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "auth.unlock" => {
            let pin: String = param(params, "pin")?;
            let ok = a.auth.unlock(&pin);
            Ok(json!({"ok": ok}))
        }
        "auth.change_pin" => {
            let current: String = param(params, "current_pin")?;
            let new_pin: String = param(params, "new_pin")?;
            if !a.auth.check_pin(&current) {
                return Err("current PIN is incorrect".to_string());
            }
            a.auth.change_pin(&new_pin).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "auth.set_lock_enabled" => {
            let enabled: bool = param(params, "enabled")?;
            a.auth.set_lock_enabled(enabled).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "locked": a.auth.is_locked()}))
        }
        "auth.activity" => {
            let signal: ActivitySignal =
                opt_param(params, "signal")?.unwrap_or(ActivitySignal::PointerMove);
            a.auth.record_activity(signal);
            Ok(json!({"ok": true}))
        }
        "auth.reset" => {
            let confirmed: bool = opt_param(params, "confirmed")?.unwrap_or(false);
            let removed = a.reset_app(confirmed).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "removed": removed}))
        }

        // ─── Bookmarks ───
        "bookmark.list" => {
            let view: ViewSettings = opt_param(params, "view")?.unwrap_or_default();
            to_json(&a.visible_bookmarks(&view))
        }
        "bookmark.get" => {
            let id: String = param(params, "id")?;
            let bookmark = a
                .bookmarks
                .get(&id)
                .ok_or_else(|| format!("Bookmark not found: {}", id))?;
            to_json(bookmark)
        }
        "bookmark.save" => {
            let draft: BookmarkDraft = param(params, "bookmark")?;
            let id: Option<String> = opt_param(params, "id")?;
            let outcome = a
                .save_bookmark(draft, id.as_deref())
                .map_err(|e| e.to_string())?;
            to_json(&outcome)
        }
        "bookmark.update_chapter" => {
            let id: String = param(params, "id")?;
            let chapter: f64 = param(params, "chapter")?;
            a.update_chapter(&id, chapter).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.revert" => {
            let id: String = param(params, "id")?;
            let date: DateTime<Utc> = param(params, "date")?;
            a.revert_bookmark(&id, date).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.delete" => {
            let ids: Vec<String> = param(params, "ids")?;
            let removed = a.delete_bookmarks(&ids).map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed}))
        }
        "bookmark.undo_delete" => {
            let restored = a.undo_delete().map_err(|e| e.to_string())?;
            Ok(json!({"restored": restored}))
        }
        "bookmark.toggle_favorite" => {
            let id: String = param(params, "id")?;
            let value = a.toggle_favorite(&id).map_err(|e| e.to_string())?;
            Ok(json!({"isFavorite": value}))
        }
        "bookmark.toggle_pinned" => {
            let id: String = param(params, "id")?;
            let value = a.toggle_pinned(&id).map_err(|e| e.to_string())?;
            Ok(json!({"isPinned": value}))
        }
        "bookmark.set_status" => {
            let ids: Vec<String> = param(params, "ids")?;
            let status_id: String = param(params, "status_id")?;
            let changed = a
                .set_bookmark_status(&ids, &status_id)
                .map_err(|e| e.to_string())?;
            Ok(json!({"changed": changed}))
        }
        "bookmark.move" => {
            let ids: Vec<String> = param(params, "ids")?;
            let folder_id: Option<String> = opt_param(params, "folder_id")?;
            let moved = a
                .move_to_folder(&ids, folder_id.as_deref())
                .map_err(|e| e.to_string())?;
            Ok(json!({"moved": moved}))
        }
        "bookmark.reorder" => {
            let ids: Vec<String> = param(params, "ids")?;
            a.reorder(&ids).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.dismiss_reminder" => {
            let id: String = param(params, "id")?;
            a.dismiss_reminder(&id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.tags" => Ok(json!(a.all_tags())),
        "bookmark.reminders" => to_json(&a.due_reminders()),

        // ─── Statuses ───
        "status.list" => to_json(&a.statuses.statuses()),
        "status.add" => {
            let label: String = param(params, "label")?;
            let color: Option<String> = opt_param(params, "color")?;
            let icon: Option<String> = opt_param(params, "icon")?;
            let status = a
                .add_status(&label, color.as_deref(), icon.as_deref())
                .map_err(|e| e.to_string())?;
            to_json(&status)
        }
        "status.update" => {
            let id: String = param(params, "id")?;
            let label: String = param(params, "label")?;
            let color: String = param(params, "color")?;
            let icon: Option<String> = opt_param(params, "icon")?;
            a.update_status(&id, &label, &color, icon.as_deref())
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "status.delete" => {
            let id: String = param(params, "id")?;
            a.delete_status(&id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Folders ───
        "folder.list" => to_json(&a.folders.folders()),
        "folder.add" => {
            let name: String = param(params, "name")?;
            let folder = a.add_folder(&name).map_err(|e| e.to_string())?;
            to_json(&folder)
        }
        "folder.rename" => {
            let id: String = param(params, "id")?;
            let name: String = param(params, "name")?;
            a.rename_folder(&id, &name).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "folder.delete" => {
            let id: String = param(params, "id")?;
            let detached = a.delete_folder(&id).map_err(|e| e.to_string())?;
            Ok(json!({"detached": detached}))
        }

        // ─── Sort presets ───
        "preset.list" => to_json(&a.presets.presets()),
        "preset.save" => {
            let name: String = param(params, "name")?;
            let view: ViewSettings = param(params, "view")?;
            let preset = a.save_preset(&name, view).map_err(|e| e.to_string())?;
            to_json(&preset)
        }
        "preset.rename" => {
            let id: String = param(params, "id")?;
            let name: String = param(params, "name")?;
            a.rename_preset(&id, &name).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "preset.delete" => {
            let id: String = param(params, "id")?;
            a.delete_preset(&id).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "preset.apply" => {
            let id: String = param(params, "id")?;
            let view = a.apply_preset(&id).map_err(|e| e.to_string())?;
            to_json(&view)
        }

        // ─── Activity & dashboard ───
        "activity.list" => to_json(&a.activity_log()),
        "activity.days" => to_json(&a.activity_days()),
        "activity.on" => {
            let day: NaiveDate = param(params, "day")?;
            to_json(&a.activity_on(day))
        }
        "activity.clear" => {
            let confirmed: bool = opt_param(params, "confirmed")?.unwrap_or(false);
            a.clear_activity_log(confirmed).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "dashboard.get" => to_json(&a.dashboard()),

        // ─── Backup ───
        "backup.export" => {
            let passphrase: Option<String> = opt_param(params, "passphrase")?;
            let data = a
                .export_backup(passphrase.as_deref())
                .map_err(|e| e.to_string())?;
            Ok(json!({"data": data, "encrypted": is_encrypted(&data)}))
        }
        "backup.is_encrypted" => {
            let data: String = param(params, "data")?;
            Ok(json!({"encrypted": is_encrypted(&data)}))
        }
        "backup.import" => {
            let data: String = param(params, "data")?;
            let passphrase: Option<String> = opt_param(params, "passphrase")?;
            let summary = a
                .import_backup(&data, passphrase.as_deref())
                .map_err(|e| e.to_string())?;
            to_json(&summary)
        }
        "backup.auto_status" => Ok(json!({
            "lastBackup": a.last_auto_backup(),
            "enabled": a.settings_engine.get_settings().backup.auto_backup_enabled,
        })),
        "backup.auto_restore" => {
            let summary = a.restore_auto_backup().map_err(|e| e.to_string())?;
            to_json(&summary)
        }

        // ─── Metadata ───
        "metadata.guess_chapter" => {
            let url: String = param(params, "url")?;
            Ok(json!({"chapter": guess_chapter_from_url(&url)}))
        }

        // ─── Settings ───
        "settings.get" => to_json(a.settings_engine.get_settings()),
        "settings.set" => {
            let key: String = param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            a.settings_engine
                .set_value(&key, value)
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Cross-tab sync ───
        "sync" => {
            let changed = a.sync().map_err(|e| e.to_string())?;
            Ok(json!({"changed": changed}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}

/// Handles `metadata.extract`: looks up `{url}` and always answers with an
/// outcome, falling back to manual entry on failure.
pub async fn handle_extract(
    app: &Mutex<MangaMarks>,
    extractor: &dyn MetadataExtractor,
    params: &Value,
) -> Result<Value, String> {
    let url: String = param(params, "url")?;
    {
        let a = app.lock().map_err(|e| e.to_string())?;
        if a.auth.is_locked() {
            return Err(LOCKED_ERROR.to_string());
        }
    }
    let outcome = extract_or_manual(extractor, &url).await;
    to_json(&outcome)
}
