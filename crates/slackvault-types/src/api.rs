use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ts::SlackTs;

// -- Envelope --

/// Every Slack Web API response carries `ok` and, on failure, an `error` code.
#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

fn next_cursor(meta: &Option<ResponseMetadata>) -> Option<&str> {
    meta.as_ref()
        .map(|m| m.next_cursor.as_str())
        .filter(|c| !c.is_empty())
}

// -- auth.test --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfo {
    pub url: Option<String>,
    pub team: Option<String>,
    pub user_id: Option<String>,
}

// -- conversations.list --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPage {
    #[serde(default)]
    pub channels: Vec<WireChannel>,
    pub response_metadata: Option<ResponseMetadata>,
}

impl ChannelPage {
    pub fn next_cursor(&self) -> Option<&str> {
        next_cursor(&self.response_metadata)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChannel {
    pub id: String,
    pub name: String,
}

// -- conversations.history / conversations.replies --

/// One page of messages. History and replies share this shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    pub response_metadata: Option<ResponseMetadata>,
}

impl MessagePage {
    pub fn next_cursor(&self) -> Option<&str> {
        next_cursor(&self.response_metadata)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMessage {
    pub ts: SlackTs,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    pub thread_ts: Option<SlackTs>,
    #[serde(default)]
    pub reply_count: u32,
    pub subtype: Option<String>,
    #[serde(default)]
    pub reactions: Vec<WireReaction>,
    #[serde(default)]
    pub files: Vec<WireFile>,
}

impl WireMessage {
    /// Join/leave notices are not archived.
    pub fn is_membership_notice(&self) -> bool {
        matches!(
            self.subtype.as_deref(),
            Some("channel_join") | Some("channel_leave")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireReaction {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFile {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub mimetype: Option<String>,
    pub url_private: Option<String>,
    pub url_private_download: Option<String>,
}

impl WireFile {
    pub fn download_url(&self) -> Option<&str> {
        self.url_private
            .as_deref()
            .or(self.url_private_download.as_deref())
            .filter(|u| !u.is_empty())
    }
}

// -- users.list --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub members: Vec<WireUser>,
    pub response_metadata: Option<ResponseMetadata>,
}

impl UserPage {
    pub fn next_cursor(&self) -> Option<&str> {
        next_cursor(&self.response_metadata)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile: WireProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireProfile {
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub image_72: Option<String>,
}

// -- emoji.list --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmojiList {
    /// name -> image URL or `alias:<target>`
    #[serde(default)]
    pub emoji: BTreeMap<String, String>,
}
