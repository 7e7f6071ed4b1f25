//! UI string localization.
//!
//! Each supported language ships a nested JSON string tree (`locales/*.json`),
//! embedded at compile time. Lookups take a dotted key such as
//! `menu.random`, walk the tree for the requested language, re-walk the
//! default-language tree when a branch is missing, and finally return the key
//! itself so a missing string is visible but never fatal.
//!
//! Sub-modules:
//! - `labels`: reverse lookup from button labels (in any language) to
//!   canonical actions.

pub mod labels;

pub use labels::{LabelAction, LabelIndex};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

const RU_TREE: &str = include_str!("../../locales/ru.json");
const EN_TREE: &str = include_str!("../../locales/en.json");
const UK_TREE: &str = include_str!("../../locales/uk.json");

/// A supported interface and content language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Ru,
    En,
    Uk,
}

impl Language {
    /// Every supported language, in keyboard order.
    pub const ALL: [Language; 3] = [Language::Ru, Language::En, Language::Uk];

    /// Language of the fallback string tree and of catalog source texts.
    pub const DEFAULT: Language = Language::Ru;

    /// Two-letter code stored in the preference record.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
            Self::Uk => "uk",
        }
    }

    /// Parse a stored language code. Empty or unknown codes yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ru" => Some(Self::Ru),
            "en" => Some(Self::En),
            "uk" => Some(Self::Uk),
            _ => None,
        }
    }

    /// Key of this language's self-name (used on the language keyboard).
    #[must_use]
    pub fn label_key(self) -> &'static str {
        match self {
            Self::Ru => "language.russian",
            Self::En => "language.english",
            Self::Uk => "language.ukrainian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Dotted-key string resolver over per-language string trees.
#[derive(Debug, Clone)]
pub struct Localizer {
    trees: HashMap<Language, Value>,
}

impl Localizer {
    /// Build a localizer from the string trees compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if an embedded tree is not valid JSON.
    pub fn embedded() -> Result<Self> {
        let mut trees = HashMap::new();
        trees.insert(Language::Ru, serde_json::from_str(RU_TREE)?);
        trees.insert(Language::En, serde_json::from_str(EN_TREE)?);
        trees.insert(Language::Uk, serde_json::from_str(UK_TREE)?);
        Ok(Self { trees })
    }

    /// Build a localizer from explicit trees. Languages without a tree fall
    /// back to the default language for every key.
    #[must_use]
    pub fn from_trees(trees: impl IntoIterator<Item = (Language, Value)>) -> Self {
        Self {
            trees: trees.into_iter().collect(),
        }
    }

    /// Resolve `key` for `lang`, falling back to the default language, then to
    /// the key itself.
    #[must_use]
    pub fn resolve(&self, lang: Language, key: &str) -> String {
        self.lookup(lang, key)
            .or_else(|| self.lookup(Language::DEFAULT, key))
            .map_or_else(|| key.to_owned(), str::to_owned)
    }

    /// The value of `key` in every supported language, after fallback.
    #[must_use]
    pub fn all_translations(&self, key: &str) -> Vec<(Language, String)> {
        Language::ALL
            .iter()
            .map(|&lang| (lang, self.resolve(lang, key)))
            .collect()
    }

    /// Every dotted key with a string leaf in `lang`'s own tree.
    #[must_use]
    pub fn keys(&self, lang: Language) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(tree) = self.trees.get(&lang) {
            collect_leaf_keys(tree, String::new(), &mut out);
        }
        out.sort();
        out
    }

    /// Keys present in the default tree but absent from `lang`'s tree.
    #[must_use]
    pub fn missing_keys(&self, lang: Language) -> Vec<String> {
        self.keys(Language::DEFAULT)
            .into_iter()
            .filter(|key| self.lookup(lang, key).is_none())
            .collect()
    }

    fn lookup(&self, lang: Language, key: &str) -> Option<&str> {
        let mut node = self.trees.get(&lang)?;
        for part in key.split('.') {
            node = node.as_object()?.get(part)?;
        }
        node.as_str()
    }
}

fn collect_leaf_keys(node: &Value, prefix: String, out: &mut Vec<String>) {
    match node {
        Value::String(_) => out.push(prefix),
        Value::Object(map) => {
            for (name, child) in map {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                collect_leaf_keys(child, key, out);
            }
        }
        _ => {}
    }
}
