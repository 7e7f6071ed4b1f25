//! SQLite DDL for the preference store.

use rusqlite::Connection;

/// Complete DDL. Every statement is `IF NOT EXISTS`, so applying it is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per user. Category and frequency hold canonical labels.
CREATE TABLE IF NOT EXISTS users (
    user_id         INTEGER PRIMARY KEY,
    language        TEXT,
    motivation_type TEXT,
    frequency       TEXT,
    next_send       INTEGER NOT NULL DEFAULT 0,
    last_send       INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_users_next_send ON users(next_send);

-- Append-only delivery log.
CREATE TABLE IF NOT EXISTS sent_texts (
    user_id INTEGER NOT NULL,
    text_id TEXT NOT NULL,
    sent_at INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sent_texts_user ON sent_texts(user_id);

-- Conversation sessions, used when sessions are persisted.
CREATE TABLE IF NOT EXISTS sessions (
    user_id    INTEGER PRIMARY KEY,
    state      TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);
"#;

/// Apply the full schema and seed the schema version on a fresh database.
///
/// Databases written by the earlier bot lack some columns (`language` on old
/// installs, `last_send` which was called `last_sent`, `sent_at` on the log);
/// they are added in place and `last_sent` values are carried over.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    upgrade_legacy_columns(conn)?;
    let version_str = super::types::CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![version_str],
    )?;
    Ok(())
}

fn upgrade_legacy_columns(conn: &Connection) -> rusqlite::Result<()> {
    let users = column_names(conn, "users")?;
    if !users.iter().any(|c| c == "language") {
        conn.execute_batch("ALTER TABLE users ADD COLUMN language TEXT")?;
    }
    if !users.iter().any(|c| c == "last_send") {
        conn.execute_batch("ALTER TABLE users ADD COLUMN last_send INTEGER NOT NULL DEFAULT 0")?;
        if users.iter().any(|c| c == "last_sent") {
            conn.execute_batch("UPDATE users SET last_send = COALESCE(last_sent, 0)")?;
        }
        tracing::info!("users table upgraded with last_send column");
    }

    let sent = column_names(conn, "sent_texts")?;
    if !sent.iter().any(|c| c == "sent_at") {
        conn.execute_batch("ALTER TABLE sent_texts ADD COLUMN sent_at INTEGER NOT NULL DEFAULT 0")?;
    }
    Ok(())
}

fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    names.collect()
}

/// Read the schema version, if one has been recorded.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_schema_creates_tables() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("apply_schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .filter_map(|r| r.ok())
            .collect();

        for table in ["users", "sent_texts", "sessions", "schema_meta"] {
            assert!(tables.contains(&table.to_owned()), "missing {table}");
        }
    }

    #[test]
    fn earlier_bot_database_is_upgraded_in_place() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "CREATE TABLE users (
                 user_id INTEGER PRIMARY KEY,
                 motivation_type TEXT,
                 frequency TEXT,
                 next_send INTEGER DEFAULT 0,
                 last_sent INTEGER DEFAULT 0
             );
             CREATE TABLE sent_texts (user_id INTEGER, text_id TEXT);
             INSERT INTO users (user_id, frequency, next_send, last_sent)
                 VALUES (7, 'Раз в День', 500, 400);",
        )
        .expect("seed legacy tables");

        apply_schema(&conn).expect("apply_schema");
        apply_schema(&conn).expect("second apply");

        let (language, last_send): (Option<String>, i64) = conn
            .query_row(
                "SELECT language, last_send FROM users WHERE user_id = 7",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("select upgraded row");
        assert!(language.is_none());
        assert_eq!(last_send, 400);

        conn.execute(
            "INSERT INTO sent_texts (user_id, text_id, sent_at) VALUES (7, 'x', 1)",
            [],
        )
        .expect("log insert after upgrade");
    }

    #[test]
    fn apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("first apply");
        apply_schema(&conn).expect("second apply");
        let version = read_schema_version(&conn).expect("read").expect("seeded");
        assert_eq!(version, super::super::types::CURRENT_SCHEMA_VERSION);
    }
}
