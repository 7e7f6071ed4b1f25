//! Reverse lookup from button labels to actions.
//!
//! Buttons send their visible label back as plain text, and a user may tap a
//! button rendered in any supported language. The index maps every label in
//! every language to the actions it can stand for. Several actions can share
//! a label (`+` or a "back" word, for example), so lookups return a list and
//! the conversation layer decides which one applies.

use super::{Language, Localizer};
use crate::catalog::MotivationType;
use crate::store::Frequency;
use std::collections::HashMap;

/// What a tapped label means, independent of language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelAction {
    Language(Language),
    Confirmation,
    LetsGo,
    MenuRandom,
    MenuUseful,
    MenuCommands,
    MenuSettings,
    ChangeType,
    ChangeFrequency,
    ChangeLanguage,
    SettingsBack,
    Motivation(MotivationType),
    Frequency(Frequency),
    Change,
    AllGood,
}

impl LabelAction {
    /// Every action with the localization key of its label.
    #[must_use]
    pub fn catalog() -> Vec<(&'static str, LabelAction)> {
        let mut out: Vec<(&'static str, LabelAction)> = vec![
            ("common.confirmation", Self::Confirmation),
            ("start.letsGo", Self::LetsGo),
            ("menu.random", Self::MenuRandom),
            ("menu.useful", Self::MenuUseful),
            ("menu.commands", Self::MenuCommands),
            ("menu.settings", Self::MenuSettings),
            ("settings.changeType", Self::ChangeType),
            ("settings.changeFrequency", Self::ChangeFrequency),
            ("settings.changeLanguage", Self::ChangeLanguage),
            ("settings.back", Self::SettingsBack),
            ("common.change", Self::Change),
            ("common.allGood", Self::AllGood),
            ("common.allOk", Self::AllGood),
        ];
        out.extend(Language::ALL.map(|l| (l.label_key(), Self::Language(l))));
        out.extend(MotivationType::ALL.map(|m| (m.label_key(), Self::Motivation(m))));
        out.extend(Frequency::ALL.map(|f| (f.label_key(), Self::Frequency(f))));
        out
    }
}

/// Label-to-action index built once from the locale trees.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    entries: HashMap<String, Vec<LabelAction>>,
}

impl LabelIndex {
    #[must_use]
    pub fn build(localizer: &Localizer) -> Self {
        let mut entries: HashMap<String, Vec<LabelAction>> = HashMap::new();
        for (key, action) in LabelAction::catalog() {
            for (_, label) in localizer.all_translations(key) {
                if label == key {
                    continue;
                }
                let actions = entries.entry(label.trim().to_owned()).or_default();
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        Self { entries }
    }

    /// Every action `text` can stand for. Empty when it is not a label.
    #[must_use]
    pub fn actions(&self, text: &str) -> &[LabelAction] {
        self.entries
            .get(text.trim())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The language whose self-name `text` is, if any.
    #[must_use]
    pub fn language(&self, text: &str) -> Option<Language> {
        self.actions(text).iter().find_map(|action| match action {
            LabelAction::Language(lang) => Some(*lang),
            _ => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
