//! Motivational text catalog.
//!
//! Texts live in a JSON document that operators edit by hand. Each text has a
//! category, a short and a long part, a new/sent status, and optional
//! per-language translations. Drawing picks uniformly among new texts; a
//! drawn text is marked sent so it is not repeated until statuses are reset.

pub mod repository;
pub mod types;

pub use repository::{JsonTextCatalog, TextRepository};
pub use types::{MotivationText, MotivationType, ResolvedText, TextStatus, TranslatedPair};
