//! Motivator: a multilingual motivational message bot.
//!
//! Users pick a language, a motivation style, and a reminder frequency
//! through reply keyboards. The bot answers on demand with a text drawn from
//! a curated catalog and sends scheduled reminders on each user's cadence.
//!
//! # Architecture
//!
//! - **i18n**: per-language string trees and the label-to-action index
//! - **catalog**: the JSON text catalog with new/sent statuses
//! - **store**: SQLite preferences, schedule, and delivery log
//! - **conversation**: the per-user state machine behind the keyboards
//! - **scheduler**: periodic delivery to due users
//! - **channels**: the Telegram adapter and the runtime that wires it all

pub mod catalog;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod delivery;
pub mod error;
pub mod i18n;
pub mod scheduler;
pub mod store;

pub use catalog::{JsonTextCatalog, MotivationText, MotivationType, TextRepository};
pub use channels::{BotServices, ChannelAdapter, InboundMessage, OutboundMessage, run_bot};
pub use config::{BotConfig, RunMode};
pub use conversation::ConversationEngine;
pub use error::{BotError, Result};
pub use i18n::{Language, Localizer};
pub use scheduler::Scheduler;
pub use store::{Frequency, SqlitePreferenceStore, UserPreference};
