//! Reply keyboard layouts.

use crate::catalog::MotivationType;
use crate::channels::ReplyKeyboard;
use crate::i18n::{Language, Localizer};
use crate::store::Frequency;

fn build(loc: &Localizer, lang: Language, rows: &[&[&str]], one_time: bool) -> ReplyKeyboard {
    ReplyKeyboard {
        rows: rows
            .iter()
            .map(|row| row.iter().map(|key| loc.resolve(lang, key)).collect())
            .collect(),
        one_time,
    }
}

/// Language names, each in its own language.
#[must_use]
pub fn language(loc: &Localizer) -> ReplyKeyboard {
    let name = |l: Language| loc.resolve(l, l.label_key());
    ReplyKeyboard {
        rows: vec![
            vec![name(Language::Ru), name(Language::En)],
            vec![name(Language::Uk)],
        ],
        one_time: true,
    }
}

#[must_use]
pub fn main_menu(loc: &Localizer, lang: Language) -> ReplyKeyboard {
    build(
        loc,
        lang,
        &[
            &["menu.random", "menu.useful"],
            &["menu.commands", "menu.settings"],
        ],
        false,
    )
}

#[must_use]
pub fn settings_menu(loc: &Localizer, lang: Language) -> ReplyKeyboard {
    build(
        loc,
        lang,
        &[
            &["settings.changeType", "settings.changeFrequency"],
            &["settings.changeLanguage"],
            &["settings.back"],
        ],
        false,
    )
}

#[must_use]
pub fn confirmation(loc: &Localizer, lang: Language) -> ReplyKeyboard {
    build(loc, lang, &[&["common.confirmation"]], true)
}

#[must_use]
pub fn start(loc: &Localizer, lang: Language) -> ReplyKeyboard {
    build(loc, lang, &[&["start.letsGo"]], true)
}

#[must_use]
pub fn motivation(loc: &Localizer, lang: Language) -> ReplyKeyboard {
    let [a, b, c, d] = MotivationType::ALL.map(MotivationType::label_key);
    build(loc, lang, &[&[a, b], &[c, d]], true)
}

#[must_use]
pub fn frequency(loc: &Localizer, lang: Language) -> ReplyKeyboard {
    let [a, b, c, d] = Frequency::ALL.map(Frequency::label_key);
    build(loc, lang, &[&[a, b], &[c, d]], true)
}
