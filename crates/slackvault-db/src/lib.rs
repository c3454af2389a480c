pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// `config` key holding the workspace base URL, used for permalinks.
pub const WORKSPACE_URL_KEY: &str = "workspace_url";

/// Location of the archive database inside a data dir.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("slack.db")
}

/// The archive database. One writer (the archiver) and any number of
/// read-only openers (the web UI) share the same file.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL so the web UI can read while the archiver writes.
        // Foreign keys stay off: legacy archives declare messages.user_id as
        // a reference to users(id), but bot and unknown authors have no row.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an existing archive without running migrations.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        info!("Database opened read-only at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Mutable access, needed to open transactions.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slackvault_types::models::{Message, MessageRecord, Reaction};

    // Schema as written by the earlier archiver, before schema_version.
    const LEGACY_SCHEMA: &str = "
        CREATE TABLE users (
            id TEXT PRIMARY KEY, name TEXT, display_name TEXT,
            avatar_url TEXT, avatar_local TEXT
        );
        CREATE TABLE messages (
            ts TEXT PRIMARY KEY, channel TEXT, user_id TEXT, text TEXT,
            thread_ts TEXT, reply_count INTEGER DEFAULT 0,
            FOREIGN KEY (user_id) REFERENCES users(id)
        );
        CREATE TABLE reactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT, message_ts TEXT,
            emoji_name TEXT, user_ids TEXT,
            FOREIGN KEY (message_ts) REFERENCES messages(ts)
        );
        CREATE TABLE files (
            id TEXT PRIMARY KEY, message_ts TEXT, name TEXT, mimetype TEXT,
            url TEXT, local_path TEXT,
            FOREIGN KEY (message_ts) REFERENCES messages(ts)
        );
        CREATE TABLE sync_state (channel TEXT PRIMARY KEY, oldest_ts TEXT, newest_ts TEXT);
        CREATE TABLE config (key TEXT PRIMARY KEY, value TEXT);
        CREATE TABLE emojis (name TEXT PRIMARY KEY, url TEXT, local_path TEXT);
    ";

    #[test]
    fn archive_lives_in_data_dir() {
        assert_eq!(
            db_path(Path::new("/srv/archive")),
            PathBuf::from("/srv/archive/slack.db")
        );
    }

    #[test]
    fn legacy_archive_accepts_bot_and_unknown_authors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slack_archive.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(LEGACY_SCHEMA)
            .unwrap();

        let db = Database::open(&path).unwrap();
        let records: Vec<MessageRecord> = [("1.000100", "B123"), ("2.000100", "unknown")]
            .into_iter()
            .map(|(ts, user)| MessageRecord {
                message: Message {
                    ts: ts.into(),
                    channel: "general".into(),
                    user_id: user.into(),
                    text: "deploy finished".into(),
                    thread_ts: None,
                    reply_count: 0,
                },
                reactions: vec![Reaction {
                    emoji_name: "tada".into(),
                    user_ids: vec!["U1".into()],
                }],
                files: vec![],
            })
            .collect();

        db.save_messages(&records).unwrap();
        // Re-saving replaces reactions under the same legacy constraints.
        db.save_messages(&records).unwrap();

        assert_eq!(db.count_messages("general").unwrap(), 2);
        let ts: Vec<String> = records.iter().map(|r| r.message.ts.to_string()).collect();
        assert_eq!(db.get_reactions_for_messages(&ts).unwrap().len(), 2);
    }
}
