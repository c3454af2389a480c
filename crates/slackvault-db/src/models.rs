//! Database row types for the read side. These map directly to SQLite rows
//! and are kept separate from the slackvault-types domain models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub avatar_local: Option<String>,
}

/// A message joined with its author.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub ts: String,
    pub channel: String,
    pub user_id: String,
    pub text: String,
    pub thread_ts: Option<String>,
    pub reply_count: i64,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_local: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub message_ts: String,
    pub emoji_name: String,
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: String,
    pub message_ts: String,
    pub name: String,
    pub mimetype: String,
    pub url: String,
    pub local_path: Option<String>,
}
