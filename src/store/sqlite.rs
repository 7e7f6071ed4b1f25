//! SQLite-backed preference store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use super::schema::{apply_schema, read_schema_version};
use super::types::{Frequency, SentRecord, SessionRow, UserId, UserPreference};
use crate::catalog::MotivationType;
use crate::error::{BotError, Result};
use crate::i18n::Language;

const USER_COLUMNS: &str =
    "user_id, language, motivation_type, frequency, next_send, last_send";

/// Per-user preferences, the delivery log, and persisted sessions.
///
/// Thread-safe via an internal `Mutex<Connection>`. Every upsert touches only
/// the columns it names, so concurrent writers of different fields never
/// clobber each other.
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        info!(path = %path.display(), "preference store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn schema_version(&self) -> Result<Option<u32>> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    /// Fetch a user's record, if one exists.
    pub fn get(&self, user_id: UserId) -> Result<Option<UserPreference>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
        Ok(conn
            .query_row(&sql, params![user_id], row_to_preference)
            .optional()?)
    }

    pub fn set_language(&self, user_id: UserId, language: Language) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (user_id, language) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET language = excluded.language",
            params![user_id, language.code()],
        )?;
        debug!(user_id, language = %language, "language saved");
        Ok(())
    }

    pub fn set_motivation_type(&self, user_id: UserId, kind: MotivationType) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (user_id, motivation_type) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET motivation_type = excluded.motivation_type",
            params![user_id, kind.as_canonical()],
        )?;
        debug!(user_id, motivation_type = kind.as_canonical(), "motivation type saved");
        Ok(())
    }

    /// Save a cadence together with its first scheduled send time.
    pub fn set_frequency(&self, user_id: UserId, frequency: Frequency, next_send: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (user_id, frequency, next_send) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 frequency = excluded.frequency,
                 next_send = excluded.next_send",
            params![user_id, frequency.as_canonical(), next_send],
        )?;
        debug!(user_id, frequency = frequency.as_canonical(), next_send, "frequency saved");
        Ok(())
    }

    /// Record a completed scheduled delivery and the next send time.
    pub fn update_schedule(&self, user_id: UserId, next_send: i64, last_send: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET next_send = ?2, last_send = ?3 WHERE user_id = ?1",
            params![user_id, next_send, last_send],
        )?;
        Ok(())
    }

    /// Users with a scheduling cadence whose next send time has passed.
    pub fn due_users(&self, now: i64) -> Result<Vec<UserPreference>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE frequency IS NOT NULL AND next_send <= ?1
             ORDER BY next_send ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![now], row_to_preference)?;

        let mut users = Vec::new();
        for r in rows {
            let pref = r?;
            // "No reminders" in any language parses to Frequency::None.
            if pref.is_due(now) {
                users.push(pref);
            }
        }
        Ok(users)
    }

    /// Append a delivery to the log.
    pub fn record_sent(&self, record: &SentRecord, sent_at: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sent_texts (user_id, text_id, sent_at) VALUES (?1, ?2, ?3)",
            params![record.user_id, record.text_id, sent_at],
        )?;
        Ok(())
    }

    /// Text ids delivered to `user_id`, oldest first.
    pub fn sent_texts(&self, user_id: UserId) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT text_id FROM sent_texts WHERE user_id = ?1 ORDER BY rowid ASC")?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        let mut ids = Vec::new();
        for r in rows {
            ids.push(r?);
        }
        Ok(ids)
    }

    /// Forget every user's language so they are asked again.
    pub fn reset_languages(&self) -> Result<usize> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET language = NULL WHERE language IS NOT NULL",
            [],
        )?;
        info!(changed, "user languages reset");
        Ok(changed)
    }

    /// Load a session row that has not expired at `now`.
    pub fn load_session(&self, user_id: UserId, now: i64) -> Result<Option<SessionRow>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT user_id, state, expires_at FROM sessions
                 WHERE user_id = ?1 AND expires_at > ?2",
                params![user_id, now],
                |row| {
                    Ok(SessionRow {
                        user_id: row.get(0)?,
                        state: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn save_session(&self, row: &SessionRow) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (user_id, state, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 state = excluded.state,
                 expires_at = excluded.expires_at",
            params![row.user_id, row.state, row.expires_at],
        )?;
        Ok(())
    }

    /// Delete session rows that expired at or before `now`.
    pub fn purge_expired_sessions(&self, now: i64) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BotError::Lock(format!("preference store lock poisoned: {e}")))
    }
}

fn row_to_preference(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserPreference> {
    let language: Option<String> = row.get(1)?;
    let motivation_type: Option<String> = row.get(2)?;
    let frequency: Option<String> = row.get(3)?;
    Ok(UserPreference {
        user_id: row.get(0)?,
        language: language.as_deref().and_then(Language::parse),
        motivation_type: motivation_type
            .as_deref()
            .and_then(MotivationType::from_canonical),
        frequency: frequency.as_deref().and_then(parse_frequency),
        next_send: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        last_send: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
    })
}

/// Unrecognized non-empty cadences are treated as daily.
fn parse_frequency(raw: &str) -> Option<Frequency> {
    if raw.trim().is_empty() {
        return None;
    }
    Frequency::from_canonical(raw).or_else(|| {
        warn!(frequency = raw, "unrecognized stored frequency; treating as daily");
        Some(Frequency::Daily)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn store() -> SqlitePreferenceStore {
        SqlitePreferenceStore::open_in_memory().unwrap()
    }

    #[test]
    fn unknown_user_has_no_record() {
        assert!(store().get(42).unwrap().is_none());
    }

    #[test]
    fn upserts_preserve_other_fields() {
        let store = store();
        store.set_language(1, Language::En).unwrap();
        store.set_motivation_type(1, MotivationType::Hard).unwrap();
        store.set_frequency(1, Frequency::Daily, 500).unwrap();
        store.set_language(1, Language::Uk).unwrap();

        let pref = store.get(1).unwrap().unwrap();
        assert_eq!(pref.language, Some(Language::Uk));
        assert_eq!(pref.motivation_type, Some(MotivationType::Hard));
        assert_eq!(pref.frequency, Some(Frequency::Daily));
        assert_eq!(pref.next_send, 500);
        assert_eq!(pref.last_send, 0);
    }

    #[test]
    fn stores_canonical_identifiers() {
        let store = store();
        store.set_motivation_type(5, MotivationType::Psychological).unwrap();
        store.set_frequency(5, Frequency::TwiceDaily, 1).unwrap();
        let conn = store.lock().unwrap();
        let (kind, freq): (String, String) = conn
            .query_row(
                "SELECT motivation_type, frequency FROM users WHERE user_id = 5",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "Психологическая перезагрузка");
        assert_eq!(freq, "Два Раза в День");
    }

    #[test]
    fn due_users_filters_by_time_and_frequency() {
        let store = store();
        store.set_frequency(1, Frequency::Daily, 100).unwrap();
        store.set_frequency(2, Frequency::Every3Days, 300).unwrap();
        store.set_frequency(3, Frequency::None, 0).unwrap();
        store.set_language(4, Language::Ru).unwrap();

        let due: Vec<UserId> = store.due_users(200).unwrap().iter().map(|u| u.user_id).collect();
        assert_eq!(due, vec![1]);

        let due: Vec<UserId> = store.due_users(300).unwrap().iter().map(|u| u.user_id).collect();
        assert_eq!(due, vec![1, 2]);
    }

    #[test]
    fn localized_labels_in_old_rows_are_understood() {
        let store = store();
        {
            let conn = store.lock().unwrap();
            conn.execute_batch(
                "INSERT INTO users (user_id, motivation_type, frequency, next_send)
                     VALUES (1, 'Soft Support', 'Once a Day', 10);
                 INSERT INTO users (user_id, motivation_type, frequency, next_send)
                     VALUES (2, 'Жорстка мотивація', 'Двічі на День', 20);
                 INSERT INTO users (user_id, frequency, next_send)
                     VALUES (3, 'No Reminders', 0);
                 INSERT INTO users (user_id, frequency, next_send)
                     VALUES (4, 'Не Треба Нагадувань', 0);
                 INSERT INTO users (user_id, frequency, next_send)
                     VALUES (5, 'whenever', 30);",
            )
            .unwrap();
        }

        let due = store.due_users(100).unwrap();
        let ids: Vec<UserId> = due.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![1, 2, 5]);

        assert_eq!(due[0].frequency, Some(Frequency::Daily));
        assert_eq!(due[0].motivation_type, Some(MotivationType::Soft));
        assert_eq!(due[1].frequency, Some(Frequency::TwiceDaily));
        assert_eq!(due[1].motivation_type, Some(MotivationType::Hard));
        assert_eq!(due[2].frequency, Some(Frequency::Daily));
        assert_eq!(store.get(3).unwrap().unwrap().frequency, Some(Frequency::None));
        assert_eq!(store.get(4).unwrap().unwrap().frequency, Some(Frequency::None));
    }

    #[test]
    fn opens_database_left_by_earlier_bot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bot.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE users (
                     user_id INTEGER PRIMARY KEY,
                     motivation_type TEXT,
                     frequency TEXT,
                     next_send INTEGER DEFAULT 0,
                     last_sent INTEGER DEFAULT 0,
                     language TEXT
                 );
                 CREATE TABLE sent_texts (user_id INTEGER, text_id TEXT);
                 INSERT INTO users VALUES (1, 'Soft Support', 'Every 3 Days', 50, 20, 'en');",
            )
            .unwrap();
        }

        let store = SqlitePreferenceStore::open(&path).unwrap();
        let due = store.due_users(100).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].language, Some(Language::En));
        assert_eq!(due[0].frequency, Some(Frequency::Every3Days));
        assert_eq!(due[0].last_send, 20);

        let record = SentRecord {
            user_id: 1,
            text_id: "t".to_owned(),
        };
        store.record_sent(&record, 100).unwrap();
        store.update_schedule(1, 400, 100).unwrap();
        assert_eq!(store.get(1).unwrap().unwrap().last_send, 100);
    }

    #[test]
    fn update_schedule_moves_user_out_of_due_set() {
        let store = store();
        store.set_frequency(1, Frequency::Daily, 100).unwrap();
        store.update_schedule(1, 90_000, 150).unwrap();
        assert!(store.due_users(150).unwrap().is_empty());
        let pref = store.get(1).unwrap().unwrap();
        assert_eq!(pref.last_send, 150);
        assert_eq!(pref.next_send, 90_000);
    }

    #[test]
    fn sent_log_appends() {
        let store = store();
        for id in ["a", "b", "a"] {
            let record = SentRecord {
                user_id: 9,
                text_id: id.to_owned(),
            };
            store.record_sent(&record, 10).unwrap();
        }
        assert_eq!(store.sent_texts(9).unwrap(), vec!["a", "b", "a"]);
        assert!(store.sent_texts(10).unwrap().is_empty());
    }

    #[test]
    fn reset_languages_clears_every_user() {
        let store = store();
        store.set_language(1, Language::En).unwrap();
        store.set_language(2, Language::Uk).unwrap();
        store.set_frequency(3, Frequency::Daily, 0).unwrap();
        assert_eq!(store.reset_languages().unwrap(), 2);
        assert!(store.get(1).unwrap().unwrap().language.is_none());
        assert_eq!(store.get(3).unwrap().unwrap().frequency, Some(Frequency::Daily));
    }

    #[test]
    fn sessions_expire() {
        let store = store();
        let row = SessionRow {
            user_id: 1,
            state: "{}".to_owned(),
            expires_at: 100,
        };
        store.save_session(&row).unwrap();
        assert_eq!(store.load_session(1, 99).unwrap(), Some(row));
        assert!(store.load_session(1, 100).unwrap().is_none());
        assert_eq!(store.purge_expired_sessions(100).unwrap(), 1);
    }

    #[test]
    fn file_backed_store_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("bot.db");
        {
            let store = SqlitePreferenceStore::open(&path).unwrap();
            store.set_language(7, Language::En).unwrap();
        }
        let store = SqlitePreferenceStore::open(&path).unwrap();
        assert_eq!(store.get(7).unwrap().unwrap().language, Some(Language::En));
        assert_eq!(store.schema_version().unwrap(), Some(1));
    }
}
