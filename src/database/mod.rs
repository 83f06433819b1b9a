//! MangaMarks database layer.
//!
//! Provides SQLite connection management and schema migrations.
//!
//! ```no_run
//! use mangamarks::database::Database;
//!
//! let db = Database::open("mangamarks.db").expect("failed to open database");
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
