//! Durable per-user preferences.
//!
//! One row per user holds the chosen language, motivation type, reminder
//! frequency, and schedule timestamps. A separate append-only table logs
//! every delivered text. Category and frequency are stored as canonical
//! default-language labels so records stay meaningful when a user switches
//! interface language.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqlitePreferenceStore;
pub use types::{Frequency, SentRecord, SessionRow, UserId, UserPreference};
