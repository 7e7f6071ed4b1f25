//! Conversation state machine.
//!
//! Every inbound message is either a slash command or free text. Free text is
//! matched against button labels in every language; session flags decide how
//! an ambiguous label (a motivation type, a frequency) is interpreted.
//!
//! Flow for a new user:
//!
//! ```text
//! (any message) ─► language keyboard ─► start button ─► motivation keyboard
//!               ─► frequency keyboard ─► main menu (ready)
//! ```
//!
//! Sub-modules:
//! - `session`: per-user flags and their storage backends.
//! - `keyboards`: reply keyboard layouts.
//! - `dispatch`: label precedence and command parsing.

pub mod dispatch;
pub mod keyboards;
pub mod session;

pub use dispatch::{Command, DISPATCH_ORDER, Rule};
pub use session::{
    ChangeTarget, ConversationSession, MemorySessionStore, SessionStore, SqliteSessionStore,
};

use crate::catalog::{MotivationType, TextRepository};
use crate::channels::{InboundMessage, OutboundMessage};
use crate::delivery;
use crate::error::Result;
use crate::i18n::{LabelAction, LabelIndex, Language, Localizer};
use crate::scheduler::schedule;
use crate::store::{Frequency, SqlitePreferenceStore, UserId, UserPreference};
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info, warn};

const HELP_COMMAND_KEYS: [&str; 9] = [
    "help.commands.random",
    "help.commands.useful",
    "help.commands.motivationType",
    "help.commands.motivation",
    "help.commands.changeMotivation",
    "help.commands.changeFrequency",
    "help.commands.start",
    "help.commands.reloadTexts",
    "help.commands.help",
];

const USEFUL_SECTION_KEYS: [&str; 8] = [
    "useful.title",
    "useful.youtube",
    "useful.videos",
    "useful.videoLinks",
    "useful.books",
    "useful.bookLinks",
    "useful.bot",
    "useful.pinterest",
];

/// Per-message context.
#[derive(Debug, Clone, Copy)]
struct Turn {
    user_id: UserId,
    chat_id: i64,
    now: i64,
}

/// Turns inbound messages into replies, updating preferences and sessions.
pub struct ConversationEngine {
    localizer: Arc<Localizer>,
    labels: LabelIndex,
    store: Arc<SqlitePreferenceStore>,
    catalog: Arc<dyn TextRepository>,
    sessions: Arc<dyn SessionStore>,
}

impl ConversationEngine {
    pub fn new(
        localizer: Arc<Localizer>,
        store: Arc<SqlitePreferenceStore>,
        catalog: Arc<dyn TextRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let labels = LabelIndex::build(&localizer);
        debug!(labels = labels.len(), "label index built");
        Self {
            localizer,
            labels,
            store,
            catalog,
            sessions,
        }
    }

    /// Handle one inbound message and produce the reply.
    ///
    /// # Errors
    ///
    /// Returns an error when preference or session storage fails.
    pub fn handle(
        &self,
        message: &InboundMessage,
        now: i64,
        rng: &mut dyn RngCore,
    ) -> Result<OutboundMessage> {
        let turn = Turn {
            user_id: message.user_id,
            chat_id: message.chat_id,
            now,
        };
        let pref = self
            .store
            .get(turn.user_id)?
            .unwrap_or_else(|| UserPreference::empty(turn.user_id));
        let loaded = self.sessions.load(turn.user_id, now)?;
        let mut session = loaded.clone();

        let reply = match Command::parse(&message.text) {
            Some(command) => {
                debug!(user_id = turn.user_id, command = command.as_str(), "command");
                self.on_command(command, &pref, &mut session, turn, rng)?
            }
            None => self.on_text(&message.text, &pref, &mut session, turn, rng)?,
        };

        if session != loaded {
            debug!(
                user_id = turn.user_id,
                phase = session.phase(pref.language.is_some()),
                "session updated"
            );
            self.sessions.save(turn.user_id, &session, now)?;
        }
        Ok(reply)
    }

    fn on_command(
        &self,
        command: Command,
        pref: &UserPreference,
        session: &mut ConversationSession,
        turn: Turn,
        rng: &mut dyn RngCore,
    ) -> Result<OutboundMessage> {
        let lang = pref.language_or_default();
        let reply = match command {
            Command::Start => match pref.language {
                None => self.language_prompt(turn, Language::DEFAULT, session),
                Some(lang) => self
                    .say(turn, lang, "start.welcome")
                    .with_keyboard(keyboards::start(&self.localizer, lang)),
            },
            Command::Random => self.motivation_reply(turn, lang, None, rng)?,
            Command::Useful => self.useful(turn, lang),
            Command::MotivationType => self
                .say(turn, lang, "motivation.description")
                .with_keyboard(keyboards::settings_menu(&self.localizer, lang)),
            Command::Motivation => {
                session.selecting_motivation = true;
                self.motivation_prompt(turn, lang)
            }
            Command::ChangeMotivation => {
                session.changing = Some(ChangeTarget::Motivation);
                self.motivation_prompt(turn, lang)
            }
            Command::ChangeFrequency => {
                session.changing = Some(ChangeTarget::Frequency);
                self.frequency_prompt(turn, lang)
            }
            Command::ReloadTexts => self.reload_texts(turn, lang),
            Command::Help => self.help(turn, lang),
        };
        Ok(reply)
    }

    fn on_text(
        &self,
        text: &str,
        pref: &UserPreference,
        session: &mut ConversationSession,
        turn: Turn,
        rng: &mut dyn RngCore,
    ) -> Result<OutboundMessage> {
        if session.selecting_language
            && let Some(chosen) = self.labels.language(text)
        {
            return self.on_language_chosen(chosen, session, turn);
        }

        let Some(lang) = pref.language else {
            return Ok(self.language_prompt(turn, Language::DEFAULT, session));
        };

        let Some(action) = dispatch::select(self.labels.actions(text)) else {
            return Ok(self.unknown(turn, lang));
        };

        let reply = match action {
            LabelAction::Confirmation => {
                session.selecting_motivation = false;
                self.help(turn, lang)
            }
            LabelAction::LetsGo => {
                // Fresh pass through style and cadence selection.
                session.selecting_motivation = false;
                session.changing = None;
                self.say(turn, lang, "motivation.description")
                    .with_keyboard(keyboards::motivation(&self.localizer, lang))
            }
            LabelAction::MenuRandom => self.motivation_reply(turn, lang, None, rng)?,
            LabelAction::MenuUseful => self.useful(turn, lang),
            LabelAction::MenuCommands => self.help(turn, lang),
            LabelAction::MenuSettings => self.settings(turn, lang, "settings.title"),
            LabelAction::ChangeType => {
                session.changing = Some(ChangeTarget::Motivation);
                self.motivation_prompt(turn, lang)
            }
            LabelAction::ChangeFrequency => {
                session.changing = Some(ChangeTarget::Frequency);
                self.frequency_prompt(turn, lang)
            }
            LabelAction::ChangeLanguage => {
                session.changing = Some(ChangeTarget::Language);
                self.language_prompt(turn, lang, session)
            }
            LabelAction::SettingsBack | LabelAction::AllGood => {
                session.clear();
                self.help(turn, lang)
            }
            LabelAction::Motivation(kind) => {
                self.on_motivation_label(kind, session, turn, lang, rng)?
            }
            LabelAction::Frequency(freq) => {
                self.on_frequency_label(freq, session, turn, lang, rng)?
            }
            LabelAction::Change => match session.changing {
                Some(ChangeTarget::Motivation) => self.motivation_prompt(turn, lang),
                Some(ChangeTarget::Frequency) => self.frequency_prompt(turn, lang),
                Some(ChangeTarget::Language) => self.language_prompt(turn, lang, session),
                None => self.settings(turn, lang, "settings.title"),
            },
            LabelAction::Language(_) => self.unknown(turn, lang),
        };
        Ok(reply)
    }

    fn on_language_chosen(
        &self,
        chosen: Language,
        session: &mut ConversationSession,
        turn: Turn,
    ) -> Result<OutboundMessage> {
        self.store.set_language(turn.user_id, chosen)?;
        info!(user_id = turn.user_id, language = %chosen, "language selected");
        session.selecting_language = false;

        let reply = self.say(turn, chosen, "language.selected");
        if session.changing == Some(ChangeTarget::Language) {
            session.changing = None;
            Ok(reply.with_keyboard(keyboards::settings_menu(&self.localizer, chosen)))
        } else {
            Ok(reply.with_keyboard(keyboards::start(&self.localizer, chosen)))
        }
    }

    fn on_motivation_label(
        &self,
        kind: MotivationType,
        session: &mut ConversationSession,
        turn: Turn,
        lang: Language,
        rng: &mut dyn RngCore,
    ) -> Result<OutboundMessage> {
        if session.selecting_motivation && session.changing.is_none() {
            session.selecting_motivation = false;
            return self.motivation_reply(turn, lang, Some(kind), rng);
        }

        match session.changing {
            Some(ChangeTarget::Motivation) => {
                self.store.set_motivation_type(turn.user_id, kind)?;
                session.changing = None;
                Ok(self.settings(turn, lang, "frequency.changed"))
            }
            Some(ChangeTarget::Frequency | ChangeTarget::Language) => {
                Ok(self.unknown(turn, lang))
            }
            None => {
                // Onboarding: the style is saved and a cadence is asked for next.
                self.store.set_motivation_type(turn.user_id, kind)?;
                info!(
                    user_id = turn.user_id,
                    motivation_type = kind.as_canonical(),
                    "style selected"
                );
                Ok(self
                    .say(turn, lang, "frequency.accepted")
                    .with_keyboard(keyboards::frequency(&self.localizer, lang)))
            }
        }
    }

    fn on_frequency_label(
        &self,
        freq: Frequency,
        session: &mut ConversationSession,
        turn: Turn,
        lang: Language,
        rng: &mut dyn RngCore,
    ) -> Result<OutboundMessage> {
        let next_send = schedule::initial_next_send(freq, turn.now, rng).unwrap_or(0);
        self.store.set_frequency(turn.user_id, freq, next_send)?;
        info!(
            user_id = turn.user_id,
            frequency = freq.as_canonical(),
            next_send,
            "frequency saved"
        );

        if session.changing.is_some() {
            session.changing = None;
            return Ok(self.settings(turn, lang, "frequency.changed"));
        }

        let text = format!(
            "{} {}",
            self.t(lang, "frequency.saved"),
            self.help_text(lang)
        );
        Ok(OutboundMessage::text(turn.chat_id, text)
            .with_keyboard(keyboards::main_menu(&self.localizer, lang)))
    }

    fn motivation_reply(
        &self,
        turn: Turn,
        lang: Language,
        category: Option<MotivationType>,
        rng: &mut dyn RngCore,
    ) -> Result<OutboundMessage> {
        let taken = delivery::take_text(
            self.catalog.as_ref(),
            &self.store,
            turn.user_id,
            category,
            lang,
            turn.now,
            rng,
        )?;
        let Some(text) = taken else {
            warn!(user_id = turn.user_id, ?category, "no new texts left");
            return Ok(self
                .say(turn, lang, "common.noTexts")
                .with_keyboard(keyboards::main_menu(&self.localizer, lang)));
        };
        let body = delivery::format_interactive(&text, delivery::pick_emoji(rng));
        Ok(OutboundMessage::text(turn.chat_id, body)
            .with_keyboard(keyboards::confirmation(&self.localizer, lang)))
    }

    fn reload_texts(&self, turn: Turn, lang: Language) -> OutboundMessage {
        let key = match self.catalog.reload() {
            Ok(_) => "common.textsReloaded",
            Err(e) => {
                warn!("text reload failed: {e}");
                "common.noTexts"
            }
        };
        self.say(turn, lang, key)
            .with_keyboard(keyboards::main_menu(&self.localizer, lang))
    }

    fn language_prompt(
        &self,
        turn: Turn,
        lang: Language,
        session: &mut ConversationSession,
    ) -> OutboundMessage {
        session.selecting_language = true;
        self.say(turn, lang, "language.select")
            .with_keyboard(keyboards::language(&self.localizer))
    }

    fn motivation_prompt(&self, turn: Turn, lang: Language) -> OutboundMessage {
        self.say(turn, lang, "motivation.select")
            .with_keyboard(keyboards::motivation(&self.localizer, lang))
    }

    fn frequency_prompt(&self, turn: Turn, lang: Language) -> OutboundMessage {
        self.say(turn, lang, "frequency.select")
            .with_keyboard(keyboards::frequency(&self.localizer, lang))
    }

    fn settings(&self, turn: Turn, lang: Language, key: &str) -> OutboundMessage {
        self.say(turn, lang, key)
            .with_keyboard(keyboards::settings_menu(&self.localizer, lang))
    }

    fn useful(&self, turn: Turn, lang: Language) -> OutboundMessage {
        let body = USEFUL_SECTION_KEYS
            .iter()
            .map(|key| self.t(lang, key))
            .collect::<Vec<_>>()
            .join("\n\n");
        OutboundMessage::text(turn.chat_id, body)
            .markdown()
            .without_link_preview()
            .with_keyboard(keyboards::confirmation(&self.localizer, lang))
    }

    fn help(&self, turn: Turn, lang: Language) -> OutboundMessage {
        OutboundMessage::text(turn.chat_id, self.help_text(lang))
            .with_keyboard(keyboards::main_menu(&self.localizer, lang))
    }

    fn unknown(&self, turn: Turn, lang: Language) -> OutboundMessage {
        self.say(turn, lang, "common.unknownCommand")
            .with_keyboard(keyboards::main_menu(&self.localizer, lang))
    }

    fn help_text(&self, lang: Language) -> String {
        let commands = HELP_COMMAND_KEYS
            .iter()
            .map(|key| self.t(lang, key))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{commands}", self.t(lang, "help.title"))
    }

    fn say(&self, turn: Turn, lang: Language, key: &str) -> OutboundMessage {
        OutboundMessage::text(turn.chat_id, self.t(lang, key))
    }

    fn t(&self, lang: Language, key: &str) -> String {
        self.localizer.resolve(lang, key)
    }
}
