//! Drawing a text for a user and rendering it as a message.
//!
//! Shared by interactive requests and scheduled reminders: both draw a new
//! text, retire it in the catalog, log the delivery, and render the content
//! in the user's language.

use crate::catalog::{MotivationType, ResolvedText, TextRepository};
use crate::error::Result;
use crate::i18n::Language;
use crate::store::{SentRecord, SqlitePreferenceStore, UserId};
use rand::RngCore;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

/// Emoji appended to every delivered text.
pub const EMOJIS: [&str; 8] = ["💪", "🔥", "☀️", "🚀", "✨", "🙌", "❤️", "⭐"];

#[must_use]
pub fn pick_emoji(rng: &mut dyn RngCore) -> &'static str {
    EMOJIS.choose(rng).copied().unwrap_or("💪")
}

/// Draw a new text for `user_id`, retire it, and log the delivery.
///
/// Returns `Ok(None)` when no new text exists for the category. A failure to
/// persist the catalog status or the log entry is logged and does not stop
/// the delivery; the text has already been retired in memory.
pub fn take_text(
    catalog: &dyn TextRepository,
    store: &SqlitePreferenceStore,
    user_id: UserId,
    category: Option<MotivationType>,
    language: Language,
    now: i64,
    rng: &mut dyn RngCore,
) -> Result<Option<ResolvedText>> {
    let Some(text) = catalog.draw(category, rng) else {
        return Ok(None);
    };

    if let Err(e) = catalog.mark_consumed(&text.id) {
        warn!(user_id, text_id = %text.id, "failed to persist text status: {e}");
    }
    let record = SentRecord {
        user_id,
        text_id: text.id.clone(),
    };
    if let Err(e) = store.record_sent(&record, now) {
        warn!(user_id, text_id = %text.id, "failed to log delivery: {e}");
    }
    debug!(user_id, text_id = %text.id, language = %language, "text drawn");
    Ok(Some(text.resolve(language)))
}

/// Body of an on-demand motivation reply.
#[must_use]
pub fn format_interactive(text: &ResolvedText, emoji: &str) -> String {
    format!("{}\n\n{} {emoji}", text.short, text.long)
}

/// Body of a scheduled reminder, led by a bold header.
#[must_use]
pub fn format_scheduled(header: &str, text: &ResolvedText, emoji: &str) -> String {
    format!("{header}\n\n{}\n\n{} {emoji}", text.short, text.long)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::catalog::{JsonTextCatalog, MotivationText, TextStatus};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn resolved() -> ResolvedText {
        ResolvedText {
            id: "1".to_owned(),
            short: "Short".to_owned(),
            long: "Long".to_owned(),
        }
    }

    #[test]
    fn interactive_format() {
        assert_eq!(format_interactive(&resolved(), "🔥"), "Short\n\nLong 🔥");
    }

    #[test]
    fn scheduled_format_has_header() {
        assert_eq!(
            format_scheduled("*Read*", &resolved(), "✨"),
            "*Read*\n\nShort\n\nLong ✨"
        );
    }

    #[test]
    fn emoji_comes_from_fixed_list() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..32 {
            assert!(EMOJIS.contains(&pick_emoji(&mut rng)));
        }
    }

    #[test]
    fn take_text_retires_and_logs() {
        let dir = tempfile::TempDir::new().unwrap();
        let catalog = JsonTextCatalog::with_texts(
            dir.path().join("texts.json"),
            vec![
                MotivationText::new("x", MotivationType::Hard, "Встань", "Иди")
                    .with_translation(Language::En, "Stand", "Go"),
            ],
        );
        let store = SqlitePreferenceStore::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        let text = take_text(&catalog, &store, 3, Some(MotivationType::Hard), Language::En, 50, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(text.short, "Stand");
        assert_eq!(catalog.get("x").unwrap().status, TextStatus::Sent);
        assert_eq!(store.sent_texts(3).unwrap(), vec!["x"]);

        let again = take_text(&catalog, &store, 3, Some(MotivationType::Hard), Language::En, 60, &mut rng)
            .unwrap();
        assert!(again.is_none());
    }
}
