//! Catalog record types and translation resolution.

use crate::i18n::Language;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One of the four fixed motivation styles.
///
/// The serialized form is the canonical (default-language) label, which is
/// what both the catalog file and the preference store carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotivationType {
    #[serde(rename = "Жесткая мотивация")]
    Hard,
    #[serde(rename = "Мягкая поддержка")]
    Soft,
    #[serde(rename = "Братский подзатыльник")]
    Brotherly,
    #[serde(rename = "Психологическая перезагрузка")]
    Psychological,
}

impl MotivationType {
    /// All styles, in keyboard order.
    pub const ALL: [MotivationType; 4] = [
        MotivationType::Hard,
        MotivationType::Brotherly,
        MotivationType::Soft,
        MotivationType::Psychological,
    ];

    /// Canonical stored identifier.
    #[must_use]
    pub fn as_canonical(self) -> &'static str {
        match self {
            Self::Hard => "Жесткая мотивация",
            Self::Soft => "Мягкая поддержка",
            Self::Brotherly => "Братский подзатыльник",
            Self::Psychological => "Психологическая перезагрузка",
        }
    }

    /// Button labels in every supported language, canonical first.
    #[must_use]
    pub fn stored_labels(self) -> [&'static str; 3] {
        match self {
            Self::Hard => ["Жесткая мотивация", "Hard Motivation", "Жорстка мотивація"],
            Self::Soft => ["Мягкая поддержка", "Soft Support", "М'яка підтримка"],
            Self::Brotherly => [
                "Братский подзатыльник",
                "Brotherly Nudge",
                "Братський підзатільник",
            ],
            Self::Psychological => [
                "Психологическая перезагрузка",
                "Psychological Reboot",
                "Психологічна перезавантаження",
            ],
        }
    }

    /// Parse a stored identifier: the canonical label or a localized one.
    #[must_use]
    pub fn from_canonical(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.stored_labels().contains(&raw))
    }

    /// Localization key of the button label.
    #[must_use]
    pub fn label_key(self) -> &'static str {
        match self {
            Self::Hard => "motivation.types.hard",
            Self::Soft => "motivation.types.soft",
            Self::Brotherly => "motivation.types.brotherly",
            Self::Psychological => "motivation.types.psychological",
        }
    }
}

/// Availability of a catalog text.
///
/// Older catalogs use `"0"` for new and `"1"` for sent. Any other value is
/// kept verbatim and treated as not drawable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextStatus {
    New,
    Sent,
    Other(String),
}

impl TextStatus {
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }
}

impl From<String> for TextStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "new" | "0" => Self::New,
            "sent" | "1" => Self::Sent,
            _ => Self::Other(raw),
        }
    }
}

impl From<TextStatus> for String {
    fn from(status: TextStatus) -> Self {
        match status {
            TextStatus::New => "new".to_owned(),
            TextStatus::Sent => "sent".to_owned(),
            TextStatus::Other(raw) => raw,
        }
    }
}

/// Translated content for one language. Either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
}

/// A catalog entry.
///
/// Fields the bot does not understand are carried through `extra` so the
/// write-through rewrite never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotivationText {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub category: String,
    pub short: String,
    pub long: String,
    pub status: TextStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<String, TranslatedPair>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content ready to send: the text in the best available language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedText {
    pub id: String,
    pub short: String,
    pub long: String,
}

impl MotivationText {
    /// Build a new entry in the default language.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        category: MotivationType,
        short: impl Into<String>,
        long: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.as_canonical().to_owned(),
            short: short.into(),
            long: long.into(),
            status: TextStatus::New,
            translations: None,
            extra: Map::new(),
        }
    }

    /// Attach a translation, replacing any existing one for `lang`.
    #[must_use]
    pub fn with_translation(mut self, lang: Language, short: &str, long: &str) -> Self {
        self.translations.get_or_insert_with(BTreeMap::new).insert(
            lang.code().to_owned(),
            TranslatedPair {
                short: Some(short.to_owned()),
                long: Some(long.to_owned()),
            },
        );
        self
    }

    /// The category as a known style, if it is one.
    #[must_use]
    pub fn motivation_type(&self) -> Option<MotivationType> {
        MotivationType::from_canonical(&self.category)
    }

    /// Pick the content to show a user of `lang`.
    ///
    /// A translation is used only when both halves are present, non-empty,
    /// and each differs from the source half. Anything less means the entry
    /// was never really translated, so the source pair is returned.
    #[must_use]
    pub fn resolve(&self, lang: Language) -> ResolvedText {
        let translated = (lang != Language::DEFAULT)
            .then(|| self.translations.as_ref()?.get(lang.code()))
            .flatten()
            .and_then(|pair| {
                let short = pair.short.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
                let long = pair.long.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
                (short != self.short.trim() && long != self.long.trim()).then_some((short, long))
            });

        let (short, long) = match translated {
            Some((short, long)) => (short.to_owned(), long.to_owned()),
            None => (self.short.clone(), self.long.clone()),
        };
        ResolvedText {
            id: self.id.clone(),
            short,
            long,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "text id must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::i18n::Localizer;
    use serde_json::json;

    fn sample() -> MotivationText {
        MotivationText::new("1", MotivationType::Hard, "Вставай", "Никто не сделает это за тебя")
    }

    #[test]
    fn canonical_identifiers_match_default_labels() {
        let loc = Localizer::embedded().unwrap();
        for kind in MotivationType::ALL {
            assert_eq!(
                loc.resolve(Language::DEFAULT, kind.label_key()),
                kind.as_canonical()
            );
            assert_eq!(MotivationType::from_canonical(kind.as_canonical()), Some(kind));
        }
        assert_eq!(MotivationType::from_canonical("Motivation"), None);
    }

    #[test]
    fn localized_labels_parse_to_the_same_style() {
        let loc = Localizer::embedded().unwrap();
        for lang in Language::ALL {
            for kind in MotivationType::ALL {
                let label = loc.resolve(lang, kind.label_key());
                assert_eq!(MotivationType::from_canonical(&label), Some(kind), "{lang}: {label}");
            }
        }
    }

    #[test]
    fn legacy_statuses_parse() {
        let raw = json!([
            {"id": 1, "category": "Мягкая поддержка", "short": "a", "long": "b", "status": "0"},
            {"id": "2", "category": "Мягкая поддержка", "short": "c", "long": "d", "status": "1"},
            {"id": "3", "category": "Мягкая поддержка", "short": "e", "long": "f", "status": "archived"}
        ]);
        let texts: Vec<MotivationText> = serde_json::from_value(raw).unwrap();
        assert_eq!(texts[0].id, "1");
        assert_eq!(texts[0].status, TextStatus::New);
        assert_eq!(texts[1].status, TextStatus::Sent);
        assert_eq!(texts[2].status, TextStatus::Other("archived".to_owned()));
        assert!(!texts[2].status.is_new());
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let raw = json!({
            "id": "7", "category": "Мягкая поддержка", "short": "a", "long": "b",
            "status": "new", "author": "zheka"
        });
        let text: MotivationText = serde_json::from_value(raw).unwrap();
        let back = serde_json::to_value(&text).unwrap();
        assert_eq!(back["author"], "zheka");
        assert_eq!(back["status"], "new");
    }

    #[test]
    fn default_language_returns_source() {
        let text = sample().with_translation(Language::En, "Get up", "Nobody will do it for you");
        let resolved = text.resolve(Language::Ru);
        assert_eq!(resolved.short, "Вставай");
    }

    #[test]
    fn complete_translation_is_used() {
        let text = sample().with_translation(Language::En, "Get up", "Nobody will do it for you");
        let resolved = text.resolve(Language::En);
        assert_eq!(resolved.short, "Get up");
        assert_eq!(resolved.long, "Nobody will do it for you");
    }

    #[test]
    fn partial_or_copied_translation_falls_back() {
        let mut text = sample();
        text.translations = Some(BTreeMap::from([
            (
                "en".to_owned(),
                TranslatedPair {
                    short: Some("Get up".to_owned()),
                    long: None,
                },
            ),
            (
                "uk".to_owned(),
                TranslatedPair {
                    short: Some("Вставай".to_owned()),
                    long: Some("Ніхто не зробить це за тебе".to_owned()),
                },
            ),
        ]));
        assert_eq!(text.resolve(Language::En).short, "Вставай");
        // Short half is identical to the source, so the entry counts as untranslated.
        assert_eq!(text.resolve(Language::Uk).long, "Никто не сделает это за тебя");
    }

    #[test]
    fn missing_translation_map_falls_back() {
        let resolved = sample().resolve(Language::Uk);
        assert_eq!(resolved.short, "Вставай");
        assert_eq!(resolved.id, "1");
    }
}
