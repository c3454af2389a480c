use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::warn;

use slackvault_types::SlackTs;
use slackvault_types::models::{EmojiDef, MessageRecord, ResolvedEmoji, User, resolve_emoji};
use slackvault_types::sync::SyncCursor;

use crate::Database;
use crate::models::{FileRow, MessageRow, ReactionRow, UserRow};

const MESSAGE_COLUMNS: &str = "m.ts, m.channel, m.user_id, m.text, m.thread_ts, m.reply_count,
     u.name, u.display_name, u.avatar_local";

impl Database {
    // -- Config --

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
                (key, value),
            )?;
            Ok(())
        })
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    // -- Users --

    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users (id, name, display_name, avatar_url, avatar_local)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.name,
                    user.display_name,
                    user.avatar_url,
                    user.avatar_local
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_users(&self) -> Result<HashMap<String, UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, COALESCE(name, ''), COALESCE(display_name, ''), avatar_local FROM users",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        display_name: row.get(2)?,
                        avatar_local: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(|u| (u.id.clone(), u)).collect())
        })
    }

    // -- Emoji --

    pub fn upsert_emoji(&self, emoji: &EmojiDef) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO emojis (name, url, local_path) VALUES (?1, ?2, ?3)",
                params![emoji.name, emoji.stored_url(), emoji.local_path()],
            )?;
            Ok(())
        })
    }

    /// Resolves `name` through any alias chain to the emoji it displays as.
    pub fn resolve_emoji(&self, name: &str) -> Result<Option<ResolvedEmoji>> {
        self.with_conn(|conn| {
            let mut failure = None;
            let resolved = resolve_emoji(name, |n| match query_emoji(conn, n) {
                Ok(def) => def,
                Err(e) => {
                    failure = Some(e);
                    None
                }
            });
            match failure {
                Some(e) => Err(e),
                None => {
                    if resolved.is_none() {
                        warn!("Emoji alias chain for '{}' does not terminate", name);
                    }
                    Ok(resolved)
                }
            }
        })
    }

    // -- Messages --

    /// Writes a batch of messages as one transaction. Reactions and files of
    /// each message are replaced wholesale.
    pub fn save_messages(&self, records: &[MessageRecord]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for record in records {
                save_record(&tx, record)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn count_messages(&self, channel: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel = ?1",
                [channel],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    /// Top-level messages of a channel, oldest first, paged from the newest
    /// end. `before` / `after` are exclusive bounds.
    pub fn get_messages(
        &self,
        channel: &str,
        before: Option<&str>,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 LEFT JOIN users u ON m.user_id = u.id
                 WHERE m.channel = ?1 AND m.thread_ts IS NULL
                   AND (?2 IS NULL OR m.ts < ?2)
                   AND (?3 IS NULL OR m.ts > ?3)
                 ORDER BY m.ts DESC
                 LIMIT ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(params![channel, before, after, limit], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    /// Whether any top-level message is older than `ts`.
    pub fn has_older(&self, channel: &str, ts: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM messages
                     WHERE channel = ?1 AND thread_ts IS NULL AND ts < ?2
                     LIMIT 1",
                    [channel, ts],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_thread_replies(&self, thread_ts: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 LEFT JOIN users u ON m.user_id = u.id
                 WHERE m.thread_ts = ?1
                 ORDER BY m.ts ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([thread_ts], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Case-insensitive substring search over message bodies, newest first.
    pub fn search_messages(
        &self,
        channel: Option<&str>,
        query: &str,
        limit: u32,
    ) -> Result<Vec<MessageRow>> {
        let pattern = format!("%{}%", escape_like(query));
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 LEFT JOIN users u ON m.user_id = u.id
                 WHERE m.text LIKE ?1 ESCAPE '\\'
                   AND (?2 IS NULL OR m.channel = ?2)
                 ORDER BY m.ts DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![pattern, channel, limit], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reactions & files --

    /// Batch-fetch reactions for a set of message timestamps.
    pub fn get_reactions_for_messages(&self, message_ts: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ts.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT message_ts, emoji_name, user_ids FROM reactions
                 WHERE message_ts IN ({})
                 ORDER BY id",
                placeholders(message_ts.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let raw = stmt
                .query_map(rusqlite::params_from_iter(message_ts.iter()), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(raw
                .into_iter()
                .map(|(message_ts, emoji_name, user_ids)| {
                    let user_ids = user_ids
                        .as_deref()
                        .map(|json| {
                            serde_json::from_str(json).unwrap_or_else(|e| {
                                warn!("Corrupt user_ids on reaction to '{}': {}", message_ts, e);
                                Vec::new()
                            })
                        })
                        .unwrap_or_default();
                    ReactionRow {
                        message_ts,
                        emoji_name,
                        user_ids,
                    }
                })
                .collect())
        })
    }

    pub fn get_files_for_messages(&self, message_ts: &[String]) -> Result<Vec<FileRow>> {
        if message_ts.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, message_ts, COALESCE(name, ''), COALESCE(mimetype, ''),
                        COALESCE(url, ''), local_path
                 FROM files WHERE message_ts IN ({})",
                placeholders(message_ts.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(message_ts.iter()), |row| {
                    Ok(FileRow {
                        id: row.get(0)?,
                        message_ts: row.get(1)?,
                        name: row.get(2)?,
                        mimetype: row.get(3)?,
                        url: row.get(4)?,
                        local_path: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sync state --

    /// The persisted cursor, if a previous run recorded one. Rows left with
    /// null bounds count as absent.
    pub fn get_cursor(&self, channel: &str) -> Result<Option<SyncCursor>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT channel_id, oldest_ts, newest_ts FROM sync_state WHERE channel = ?1",
                    [channel],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()?;

            Ok(match row {
                Some((channel_id, oldest, Some(newest))) => Some(SyncCursor {
                    channel: channel.to_string(),
                    channel_id,
                    oldest_ts: SlackTs::new(oldest.unwrap_or_else(|| newest.clone())),
                    newest_ts: SlackTs::new(newest),
                }),
                _ => None,
            })
        })
    }

    pub fn put_cursor(&self, cursor: &SyncCursor) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sync_state (channel, oldest_ts, newest_ts, channel_id)
                 VALUES (?1, ?2, ?3, COALESCE(?4, (SELECT channel_id FROM sync_state WHERE channel = ?1)))",
                params![
                    cursor.channel,
                    cursor.oldest_ts.as_str(),
                    cursor.newest_ts.as_str(),
                    cursor.channel_id
                ],
            )?;
            Ok(())
        })
    }
}

fn save_record(conn: &Connection, record: &MessageRecord) -> Result<()> {
    let msg = &record.message;
    let ts = msg.ts.as_str();

    conn.execute(
        "INSERT INTO messages (ts, channel, user_id, text, thread_ts, reply_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(ts) DO UPDATE SET
            channel = excluded.channel,
            user_id = excluded.user_id,
            text = excluded.text,
            thread_ts = excluded.thread_ts,
            reply_count = excluded.reply_count",
        params![
            ts,
            msg.channel,
            msg.user_id,
            msg.text,
            msg.thread_ts.as_ref().map(SlackTs::as_str),
            msg.reply_count
        ],
    )?;

    conn.execute("DELETE FROM reactions WHERE message_ts = ?1", [ts])?;
    for reaction in &record.reactions {
        conn.execute(
            "INSERT INTO reactions (message_ts, emoji_name, user_ids) VALUES (?1, ?2, ?3)",
            params![ts, reaction.emoji_name, serde_json::to_string(&reaction.user_ids)?],
        )?;
    }

    conn.execute("DELETE FROM files WHERE message_ts = ?1", [ts])?;
    for file in &record.files {
        conn.execute(
            "INSERT OR REPLACE INTO files (id, message_ts, name, mimetype, url, local_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![file.id, ts, file.name, file.mimetype, file.url, file.local_path],
        )?;
    }

    Ok(())
}

fn query_emoji(conn: &Connection, name: &str) -> Result<Option<EmojiDef>> {
    let row = conn
        .query_row(
            "SELECT url, local_path FROM emojis WHERE name = ?1",
            [name],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                ))
            },
        )
        .optional()?;

    Ok(row.map(|(url, local_path)| {
        let mut def = EmojiDef::parse(name, url.as_deref().unwrap_or_default());
        if let slackvault_types::models::EmojiSource::Image { local_path: lp, .. } = &mut def.source {
            *lp = local_path;
        }
        def
    }))
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        ts: row.get(0)?,
        channel: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        user_id: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        thread_ts: row.get(4)?,
        reply_count: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        user_name: row.get(6)?,
        display_name: row.get(7)?,
        avatar_local: row.get(8)?,
    })
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
