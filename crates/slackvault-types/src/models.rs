use serde::{Deserialize, Serialize};

use crate::api::{WireMessage, WireUser};
use crate::ts::SlackTs;

/// Longest alias chain followed before giving up.
pub const MAX_ALIAS_HOPS: usize = 16;

const ALIAS_PREFIX: &str = "alias:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub ts: SlackTs,
    pub channel: String,
    pub user_id: String,
    pub text: String,
    /// Set only on replies; parents keep this empty even though Slack echoes
    /// their own ts back in `thread_ts`.
    pub thread_ts: Option<SlackTs>,
    pub reply_count: u32,
}

impl Message {
    pub fn from_wire(channel: &str, wire: &WireMessage) -> Self {
        let user_id = wire
            .user
            .clone()
            .or_else(|| wire.bot_id.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let thread_ts = wire.thread_ts.clone().filter(|t| *t != wire.ts);

        Self {
            ts: wire.ts.clone(),
            channel: channel.to_string(),
            user_id,
            text: wire.text.clone(),
            thread_ts,
            reply_count: wire.reply_count,
        }
    }

    /// Re-anchor this message as a reply of `parent`.
    pub fn into_reply_of(mut self, parent: &SlackTs) -> Self {
        self.thread_ts = Some(parent.clone());
        self
    }

    pub fn has_replies(&self) -> bool {
        self.thread_ts.is_none() && self.reply_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji_name: String,
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: String,
    pub name: String,
    pub mimetype: String,
    pub url: String,
    /// Path relative to the data dir, once the bytes are on disk.
    pub local_path: Option<String>,
}

/// A message together with the rows that hang off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub message: Message,
    pub reactions: Vec<Reaction>,
    pub files: Vec<FileAttachment>,
}

impl MessageRecord {
    /// Builds the record from a wire message. File local paths are left
    /// empty; the media layer fills them in.
    pub fn from_wire(channel: &str, wire: &WireMessage) -> Self {
        let reactions = wire
            .reactions
            .iter()
            .map(|r| Reaction {
                emoji_name: r.name.clone(),
                user_ids: r.users.clone(),
            })
            .collect();

        let files = wire
            .files
            .iter()
            .map(|f| FileAttachment {
                id: f.id.clone(),
                name: f.name.clone().unwrap_or_else(|| "unknown".to_string()),
                mimetype: f.mimetype.clone().unwrap_or_default(),
                url: f.download_url().unwrap_or_default().to_string(),
                local_path: None,
            })
            .collect();

        Self {
            message: Message::from_wire(channel, wire),
            reactions,
            files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub avatar_url: String,
    pub avatar_local: Option<String>,
}

impl User {
    pub fn from_wire(wire: &WireUser) -> Self {
        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());
        let display_name = non_empty(&wire.profile.display_name)
            .or_else(|| non_empty(&wire.profile.real_name))
            .unwrap_or_else(|| wire.name.clone());

        Self {
            id: wire.id.clone(),
            name: wire.name.clone(),
            display_name,
            avatar_url: wire.profile.image_72.clone().unwrap_or_default(),
            avatar_local: None,
        }
    }
}

// -- Emoji --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmojiSource {
    Image {
        url: String,
        local_path: Option<String>,
    },
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiDef {
    pub name: String,
    pub source: EmojiSource,
}

impl EmojiDef {
    /// Parses an `emoji.list` entry: either an image URL or `alias:<target>`.
    pub fn parse(name: &str, value: &str) -> Self {
        let source = match value.strip_prefix(ALIAS_PREFIX) {
            Some(target) => EmojiSource::Alias(target.to_string()),
            None => EmojiSource::Image {
                url: value.to_string(),
                local_path: None,
            },
        };
        Self {
            name: name.to_string(),
            source,
        }
    }

    /// The value stored in the `url` column, aliases keep their marker.
    pub fn stored_url(&self) -> String {
        match &self.source {
            EmojiSource::Image { url, .. } => url.clone(),
            EmojiSource::Alias(target) => format!("{ALIAS_PREFIX}{target}"),
        }
    }

    pub fn local_path(&self) -> Option<&str> {
        match &self.source {
            EmojiSource::Image { local_path, .. } => local_path.as_deref(),
            EmojiSource::Alias(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedEmoji {
    /// Workspace image emoji.
    Custom {
        name: String,
        url: String,
        local_path: Option<String>,
    },
    /// Built-in emoji, rendered by name.
    Standard { name: String },
}

/// Follows alias pointers until a non-alias definition is reached.
///
/// Names missing from the custom set are standard emoji. Returns `None` when
/// the chain is longer than [`MAX_ALIAS_HOPS`], which is how cycles surface.
pub fn resolve_emoji<F>(name: &str, mut lookup: F) -> Option<ResolvedEmoji>
where
    F: FnMut(&str) -> Option<EmojiDef>,
{
    let mut current = name.to_string();
    for _ in 0..=MAX_ALIAS_HOPS {
        match lookup(&current) {
            None => return Some(ResolvedEmoji::Standard { name: current }),
            Some(EmojiDef {
                name,
                source: EmojiSource::Image { url, local_path },
            }) => return Some(ResolvedEmoji::Custom { name, url, local_path }),
            Some(EmojiDef {
                source: EmojiSource::Alias(target),
                ..
            }) => current = target,
        }
    }
    None
}
