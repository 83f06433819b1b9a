//! MangaMarks RPC Server: JSON-RPC over stdin/stdout for a UI front-end.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.save", "params":{"bookmark":{...}}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr; stdout carries only the protocol.

use std::io::{self, Write};
use std::process;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mangamarks::app::MangaMarks;
use mangamarks::rpc_handler::{handle_extract, handle_method};
use mangamarks::services::metadata_extractor::HttpMetadataExtractor;
use mangamarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Environment variable pointing at an alternative `settings.json`.
const CONFIG_ENV: &str = "MANGAMARKS_CONFIG";

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn send(message: &Value) {
    let mut stdout = io::stdout().lock();
    if writeln!(stdout, "{}", message).and_then(|_| stdout.flush()).is_err() {
        warn!("failed to write response to stdout");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_engine = SettingsEngine::new(std::env::var(CONFIG_ENV).ok());
    let mut app = match MangaMarks::open(settings_engine) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to initialise MangaMarks");
            process::exit(1);
        }
    };
    if let Err(e) = app.startup() {
        warn!(error = %e, "startup maintenance failed");
    }

    let extractor = match HttpMetadataExtractor::new(&app.settings_engine.get_settings().metadata) {
        Ok(extractor) => extractor,
        Err(e) => {
            error!(error = %e, "failed to build metadata client");
            process::exit(1);
        }
    };
    let app = Mutex::new(app);

    send(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    info!("RPC server ready");

    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                send(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            send(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let result = if method == "metadata.extract" {
            handle_extract(&app, &extractor, &params).await
        } else {
            handle_method(&app, method, &params)
        };

        let response = match result {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        send(&response);
    }

    info!("stdin closed, shutting down");
}
