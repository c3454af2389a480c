use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| {
            r.get(0)
        })?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // IF NOT EXISTS: archives written before schema_version existed
        // already carry these tables.
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id              TEXT PRIMARY KEY,
                name            TEXT,
                display_name    TEXT,
                avatar_url      TEXT,
                avatar_local    TEXT
            );

            CREATE TABLE IF NOT EXISTS messages (
                ts              TEXT PRIMARY KEY,
                channel         TEXT,
                user_id         TEXT,
                text            TEXT,
                thread_ts       TEXT,
                reply_count     INTEGER DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS reactions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                message_ts      TEXT REFERENCES messages(ts),
                emoji_name      TEXT,
                user_ids        TEXT
            );

            CREATE TABLE IF NOT EXISTS files (
                id              TEXT PRIMARY KEY,
                message_ts      TEXT REFERENCES messages(ts),
                name            TEXT,
                mimetype        TEXT,
                url             TEXT,
                local_path      TEXT
            );

            CREATE TABLE IF NOT EXISTS sync_state (
                channel         TEXT PRIMARY KEY,
                oldest_ts       TEXT,
                newest_ts       TEXT
            );

            CREATE TABLE IF NOT EXISTS config (
                key             TEXT PRIMARY KEY,
                value           TEXT
            );

            CREATE TABLE IF NOT EXISTS emojis (
                name            TEXT PRIMARY KEY,
                url             TEXT,
                local_path      TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages(channel);
            CREATE INDEX IF NOT EXISTS idx_messages_thread_ts ON messages(thread_ts);
            CREATE INDEX IF NOT EXISTS idx_reactions_message_ts ON reactions(message_ts);
            CREATE INDEX IF NOT EXISTS idx_files_message_ts ON files(message_ts);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    // Older archives predate sync_state.channel_id
    if !has_column(conn, "sync_state", "channel_id")? {
        info!("Adding sync_state.channel_id");
        conn.execute_batch("ALTER TABLE sync_state ADD COLUMN channel_id TEXT;")?;
    }

    info!("Database migrations complete");
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}
