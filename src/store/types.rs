//! Preference store record types.

use crate::catalog::MotivationType;
use crate::i18n::Language;

/// Chat user identifier. Private chats share the user id as chat id.
pub type UserId = i64;

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Reminder cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    None,
    Daily,
    TwiceDaily,
    Every3Days,
}

impl Frequency {
    /// All cadences, in keyboard order.
    pub const ALL: [Frequency; 4] = [
        Frequency::None,
        Frequency::Daily,
        Frequency::TwiceDaily,
        Frequency::Every3Days,
    ];

    /// Canonical stored identifier (the default-language button label).
    #[must_use]
    pub fn as_canonical(self) -> &'static str {
        match self {
            Self::None => "Не Надо Напоминаний",
            Self::Daily => "Раз в День",
            Self::TwiceDaily => "Два Раза в День",
            Self::Every3Days => "Раз в 3 Дня",
        }
    }

    /// Button labels in every supported language, canonical first.
    #[must_use]
    pub fn stored_labels(self) -> [&'static str; 3] {
        match self {
            Self::None => ["Не Надо Напоминаний", "No Reminders", "Не Треба Нагадувань"],
            Self::Daily => ["Раз в День", "Once a Day", "Раз на День"],
            Self::TwiceDaily => ["Два Раза в День", "Twice a Day", "Двічі на День"],
            Self::Every3Days => ["Раз в 3 Дня", "Every 3 Days", "Раз в 3 Дні"],
        }
    }

    /// Parse a stored value. Older rows may hold the label in any language.
    #[must_use]
    pub fn from_canonical(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|freq| freq.stored_labels().contains(&raw))
    }

    /// Localization key of the button label.
    #[must_use]
    pub fn label_key(self) -> &'static str {
        match self {
            Self::None => "frequency.none",
            Self::Daily => "frequency.daily",
            Self::TwiceDaily => "frequency.twiceDaily",
            Self::Every3Days => "frequency.every3Days",
        }
    }

    /// Whether this cadence produces scheduled deliveries.
    #[must_use]
    pub fn is_scheduled(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One user's persisted preferences and schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreference {
    pub user_id: UserId,
    pub language: Option<Language>,
    pub motivation_type: Option<MotivationType>,
    pub frequency: Option<Frequency>,
    /// Unix seconds of the next scheduled delivery; 0 means unscheduled.
    pub next_send: i64,
    /// Unix seconds of the last scheduled delivery; 0 means never.
    pub last_send: i64,
}

impl UserPreference {
    /// A record with nothing chosen yet.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            language: None,
            motivation_type: None,
            frequency: None,
            next_send: 0,
            last_send: 0,
        }
    }

    /// Interface language, defaulting when none has been chosen.
    #[must_use]
    pub fn language_or_default(&self) -> Language {
        self.language.unwrap_or(Language::DEFAULT)
    }

    /// Whether a scheduled delivery is owed at `now`.
    #[must_use]
    pub fn is_due(&self, now: i64) -> bool {
        self.frequency.is_some_and(Frequency::is_scheduled) && self.next_send <= now
    }
}

/// A (user, text) pair recorded after each delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub user_id: UserId,
    pub text_id: String,
}

/// A persisted conversation session row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub user_id: UserId,
    /// JSON-encoded session state.
    pub state: String,
    /// Unix seconds after which the row is ignored.
    pub expires_at: i64,
}
