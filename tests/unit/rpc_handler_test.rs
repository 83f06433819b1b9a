//! Unit tests for the RPC handler: JSON-RPC methods dispatched by `handle_method`
//! and the asynchronous `metadata.extract` path.
//!
//! Apps run on in-memory storage; a second tab of the same storage area is
//! used to start a session that comes up locked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use mangamarks::app::MangaMarks;
use mangamarks::rpc_handler::{handle_extract, handle_method, LOCKED_ERROR};
use mangamarks::services::auth_lock::AuthLockTrait;
use mangamarks::services::clock::ManualClock;
use mangamarks::services::metadata_extractor::{ExtractedMetadata, MetadataExtractor};
use mangamarks::services::settings_engine::SettingsEngine;
use mangamarks::storage::{LocalStorage, StorageArea};
use mangamarks::types::errors::MetadataError;
use mangamarks::types::settings::TrackerSettings;

fn build(tab: &LocalStorage, dir: &TempDir) -> Mutex<MangaMarks> {
    let mut settings = TrackerSettings::default();
    settings.security.pin_hash_iterations = 1_000;
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    let clock = Arc::new(ManualClock::new(
        Local
            .with_ymd_and_hms(2024, 6, 5, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc),
    ));
    Mutex::new(MangaMarks::with_storage(
        tab,
        clock,
        SettingsEngine::with_settings(Some(path), settings),
    ))
}

/// Fresh unlocked app with no PIN.
fn setup() -> (Mutex<MangaMarks>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let app = build(&StorageArea::in_memory().open_tab(), &tmp);
    (app, tmp)
}

/// App whose PIN (1234) and lock were set in an earlier session.
fn setup_locked() -> (Mutex<MangaMarks>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let area = StorageArea::in_memory();
    let earlier = build(&area.open_tab(), &tmp);
    call(&earlier, "auth.set_pin", json!({"pin": "1234"}));
    call(&earlier, "auth.set_lock_enabled", json!({"enabled": true}));
    (build(&area.open_tab(), &tmp), tmp)
}

fn call(app: &Mutex<MangaMarks>, method: &str, params: Value) -> Value {
    handle_method(app, method, &params)
        .unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

fn save(app: &Mutex<MangaMarks>, title: &str, url: &str, chapter: f64) -> String {
    let res = call(
        app,
        "bookmark.save",
        json!({"bookmark": {"title": title, "url": url, "chapter": chapter, "statusId": "reading"}}),
    );
    res["id"].as_str().unwrap().to_string()
}

// ─── Ping & dispatch ───

#[test]
fn test_ping() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "ping", json!({})), json!({"pong": true}));
}

#[test]
fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "nonexistent.method", &json!({})).unwrap_err();
    assert!(err.contains("unknown method"));
}

#[test]
fn test_missing_and_invalid_params() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "bookmark.save", &json!({})).unwrap_err();
    assert_eq!(err, "missing bookmark");
    let err = handle_method(&app, "bookmark.delete", &json!({"ids": "abc"})).unwrap_err();
    assert!(err.starts_with("invalid ids"));
}

// ─── Lock screen ───

#[test]
fn test_locked_app_serves_only_the_lock_screen() {
    let (app, _tmp) = setup_locked();

    assert_eq!(call(&app, "ping", json!({})), json!({"pong": true}));
    assert_eq!(call(&app, "auth.state", json!({}))["state"], "locked");
    for method in ["bookmark.list", "dashboard.get", "backup.export", "settings.get"] {
        assert_eq!(
            handle_method(&app, method, &json!({})).unwrap_err(),
            LOCKED_ERROR
        );
    }
    assert_eq!(
        handle_method(&app, "auth.set_pin", &json!({"pin": "0000"})).unwrap_err(),
        LOCKED_ERROR
    );

    assert_eq!(call(&app, "auth.unlock", json!({"pin": "9999"})), json!({"ok": false}));
    assert_eq!(call(&app, "auth.unlock", json!({"pin": "1234"})), json!({"ok": true}));
    assert_eq!(call(&app, "auth.state", json!({}))["state"], "unlocked");
    assert_eq!(call(&app, "bookmark.list", json!({})), json!([]));
}

#[test]
fn test_reset_from_the_lock_screen() {
    let (app, _tmp) = setup_locked();
    assert!(handle_method(&app, "auth.reset", &json!({})).is_err());

    let res = call(&app, "auth.reset", json!({"confirmed": true}));
    assert_eq!(res["ok"], true);
    let state = call(&app, "auth.state", json!({}));
    assert_eq!(state["state"], "noPinSet");
    assert_eq!(state["locked"], false);
}

#[test]
fn test_change_pin_checks_the_current_pin() {
    let (app, _tmp) = setup();
    call(&app, "auth.set_pin", json!({"pin": "1234"}));

    let err = handle_method(
        &app,
        "auth.change_pin",
        &json!({"current_pin": "0000", "new_pin": "5678"}),
    )
    .unwrap_err();
    assert_eq!(err, "current PIN is incorrect");

    call(&app, "auth.change_pin", json!({"current_pin": "1234", "new_pin": "5678"}));
    assert!(app.lock().unwrap().auth.check_pin("5678"));
}

// ─── Bookmarks ───

#[test]
fn test_bookmark_save_list_and_merge() {
    let (app, _tmp) = setup();
    let id = save(&app, "Solo Leveling", "https://example.com/solo", 10.0);

    let res = call(
        &app,
        "bookmark.save",
        json!({"bookmark": {"title": "Solo Leveling Chapter 11", "url": "https://example.com/solo", "chapter": 11, "statusId": "reading"}}),
    );
    assert_eq!(res, json!({"id": id, "kind": "merged"}));

    let list = call(&app, "bookmark.list", json!({}));
    let items = list.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["chapter"], 11.0);
    assert_eq!(items[0]["history"].as_array().unwrap().len(), 1);

    let fetched = call(&app, "bookmark.get", json!({"id": id}));
    assert_eq!(fetched["title"], "Solo Leveling Chapter 11");
}

#[test]
fn test_bookmark_list_applies_the_view() {
    let (app, _tmp) = setup();
    let a = save(&app, "Berserk", "https://example.com/berserk", 1.0);
    save(&app, "Monster", "https://example.com/monster", 1.0);
    call(&app, "bookmark.toggle_favorite", json!({"id": a}));

    let list = call(&app, "bookmark.list", json!({"view": {"showFavorites": true}}));
    let items = list.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Berserk");
}

#[test]
fn test_delete_and_undo() {
    let (app, _tmp) = setup();
    let id = save(&app, "Berserk", "https://example.com/berserk", 1.0);

    assert_eq!(call(&app, "bookmark.delete", json!({"ids": [id]})), json!({"removed": 1}));
    assert_eq!(call(&app, "bookmark.undo_delete", json!({})), json!({"restored": 1}));
    assert!(handle_method(&app, "bookmark.undo_delete", &json!({})).is_err());
}

#[test]
fn test_folder_delete_reports_detached_bookmarks() {
    let (app, _tmp) = setup();
    let id = save(&app, "Berserk", "https://example.com/berserk", 1.0);
    let folder = call(&app, "folder.add", json!({"name": "Seinen"}));
    let folder_id = folder["id"].as_str().unwrap();

    assert_eq!(
        call(&app, "bookmark.move", json!({"ids": [id], "folder_id": folder_id})),
        json!({"moved": 1})
    );
    assert_eq!(
        call(&app, "folder.delete", json!({"id": folder_id})),
        json!({"detached": 1})
    );
    assert!(call(&app, "bookmark.get", json!({"id": id})).get("folderId").is_none());
}

#[test]
fn test_status_in_use_is_refused() {
    let (app, _tmp) = setup();
    save(&app, "Berserk", "https://example.com/berserk", 1.0);
    let err = handle_method(&app, "status.delete", &json!({"id": "reading"})).unwrap_err();
    assert!(err.contains("in use"));
}

// ─── Activity, backup, settings ───

#[test]
fn test_activity_clear_requires_confirmation() {
    let (app, _tmp) = setup();
    save(&app, "Berserk", "https://example.com/berserk", 1.0);

    assert!(handle_method(&app, "activity.clear", &json!({})).is_err());
    assert_eq!(call(&app, "activity.list", json!({})).as_array().unwrap().len(), 1);
    call(&app, "activity.clear", json!({"confirmed": true}));
    assert_eq!(call(&app, "activity.list", json!({})), json!([]));
}

#[test]
fn test_activity_by_calendar_day() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "activity.days", json!({})), json!([]));
    save(&app, "Berserk", "https://example.com/berserk", 1.0);

    assert_eq!(call(&app, "activity.days", json!({})), json!(["2024-06-05"]));
    let entries = call(&app, "activity.on", json!({"day": "2024-06-05"}));
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["type"], "CREATE");
    assert_eq!(call(&app, "activity.on", json!({"day": "2024-06-04"})), json!([]));

    let err = handle_method(&app, "activity.on", &json!({"day": "June 5th"})).unwrap_err();
    assert!(err.starts_with("invalid day"));
}

#[test]
fn test_backup_export_and_import() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "backup.export", &json!({})).unwrap_err();
    assert_eq!(err, "There are no bookmarks to export");

    save(&app, "Berserk", "https://example.com/berserk", 1.0);
    let exported = call(&app, "backup.export", json!({"passphrase": "secret"}));
    assert_eq!(exported["encrypted"], true);
    let data = exported["data"].as_str().unwrap();
    assert_eq!(call(&app, "backup.is_encrypted", json!({"data": data})), json!({"encrypted": true}));

    let (other, _tmp2) = setup();
    let summary = call(&other, "backup.import", json!({"data": data, "passphrase": "secret"}));
    assert_eq!(summary["bookmarks"], 1);
    assert_eq!(summary["readingStatuses"], 5);
}

#[test]
fn test_settings_get_and_set() {
    let (app, tmp) = setup();
    assert_eq!(call(&app, "settings.get", json!({}))["backup"]["auto_backup_interval_days"], 3);

    call(&app, "settings.set", json!({"key": "backup.auto_backup_interval_days", "value": 7}));
    assert_eq!(call(&app, "settings.get", json!({}))["backup"]["auto_backup_interval_days"], 7);
    assert!(tmp.path().join("settings.json").exists());

    assert!(handle_method(&app, "settings.set", &json!({"key": "backup.nope", "value": 1})).is_err());
}

#[test]
fn test_guess_chapter() {
    let (app, _tmp) = setup();
    let res = call(
        &app,
        "metadata.guess_chapter",
        json!({"url": "https://example.com/tower-of-god/chapter-550"}),
    );
    assert_eq!(res, json!({"chapter": 550.0}));
}

// ─── metadata.extract ───

struct Fixed;

#[async_trait]
impl MetadataExtractor for Fixed {
    async fn extract(&self, _url: &str) -> Result<ExtractedMetadata, MetadataError> {
        Ok(ExtractedMetadata {
            title: "Tower of God".to_string(),
            chapter: 550.0,
        })
    }
}

#[tokio::test]
async fn test_extract_fills_when_unlocked() {
    let (app, _tmp) = setup();
    let res = handle_extract(&app, &Fixed, &json!({"url": "https://example.com/tog"}))
        .await
        .unwrap();
    assert_eq!(
        res,
        json!({"outcome": "filled", "title": "Tower of God", "chapter": 550.0})
    );
}

#[tokio::test]
async fn test_extract_is_refused_while_locked() {
    let (app, _tmp) = setup_locked();
    let err = handle_extract(&app, &Fixed, &json!({"url": "https://example.com/tog"}))
        .await
        .unwrap_err();
    assert_eq!(err, LOCKED_ERROR);
}
