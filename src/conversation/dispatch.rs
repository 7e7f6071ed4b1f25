//! Label precedence and slash-command parsing.
//!
//! A label can stand for more than one action across languages. Rules are
//! tried in [`DISPATCH_ORDER`]; the first rule matched by any of the label's
//! actions wins. Language names are handled before this table, and only
//! while a language keyboard is showing.

use crate::i18n::LabelAction;

/// One family of label actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Confirmation,
    LetsGo,
    Menu,
    Settings,
    Motivation,
    Frequency,
    Change,
    AllGood,
}

/// Precedence of rules when a label is ambiguous.
pub const DISPATCH_ORDER: [Rule; 8] = [
    Rule::Confirmation,
    Rule::LetsGo,
    Rule::Menu,
    Rule::Settings,
    Rule::Motivation,
    Rule::Frequency,
    Rule::Change,
    Rule::AllGood,
];

impl Rule {
    #[must_use]
    pub fn matches(self, action: &LabelAction) -> bool {
        use LabelAction as A;
        match self {
            Self::Confirmation => matches!(action, A::Confirmation),
            Self::LetsGo => matches!(action, A::LetsGo),
            Self::Menu => matches!(
                action,
                A::MenuRandom | A::MenuUseful | A::MenuCommands | A::MenuSettings
            ),
            Self::Settings => matches!(
                action,
                A::ChangeType | A::ChangeFrequency | A::ChangeLanguage | A::SettingsBack
            ),
            Self::Motivation => matches!(action, A::Motivation(_)),
            Self::Frequency => matches!(action, A::Frequency(_)),
            Self::Change => matches!(action, A::Change),
            Self::AllGood => matches!(action, A::AllGood),
        }
    }
}

/// Pick the action that handles a label.
#[must_use]
pub fn select(actions: &[LabelAction]) -> Option<LabelAction> {
    DISPATCH_ORDER
        .iter()
        .find_map(|rule| actions.iter().find(|a| rule.matches(a)).copied())
}

/// A recognized slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Random,
    Useful,
    MotivationType,
    Motivation,
    ChangeMotivation,
    ChangeFrequency,
    ReloadTexts,
    Help,
}

impl Command {
    /// Parse `/name`, `/name@botname`, or either followed by arguments.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(n, _)| n);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "random" => Some(Self::Random),
            "useful" => Some(Self::Useful),
            "motivation_type" => Some(Self::MotivationType),
            "motivation" => Some(Self::Motivation),
            "change_motivation" => Some(Self::ChangeMotivation),
            "change_frequency" => Some(Self::ChangeFrequency),
            "reload_texts" => Some(Self::ReloadTexts),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Random => "random",
            Self::Useful => "useful",
            Self::MotivationType => "motivation_type",
            Self::Motivation => "motivation",
            Self::ChangeMotivation => "change_motivation",
            Self::ChangeFrequency => "change_frequency",
            Self::ReloadTexts => "reload_texts",
            Self::Help => "help",
        }
    }
}
