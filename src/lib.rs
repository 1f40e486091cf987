//! Class schedule synchronisation and per-lesson notes.
//!
//! Lessons are downloaded from the college site, parsed into rows and kept in
//! a local SQLite store alongside the user's notes. The [`schedule`] and
//! [`notes`] repositories are the entry points; the CLI in `main.rs` is a thin
//! shell over them.

pub mod config;
pub mod dates;
pub mod db;
pub mod export;
pub mod filters;
pub mod logging;
pub mod network;
pub mod notes;
pub mod parser;
pub mod schedule;
pub mod settings;
pub mod status;

pub use config::Config;
pub use db::{Database, Lesson, Note};
pub use notes::NotesRepository;
pub use schedule::{ScheduleRepository, SyncReport};
pub use settings::Settings;
pub use status::{Observable, SyncStatus};
