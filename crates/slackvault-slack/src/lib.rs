pub mod client;
pub mod error;

pub use client::SlackClient;
pub use error::SlackError;

use slackvault_types::SlackTs;
use slackvault_types::api::{AuthInfo, ChannelPage, EmojiList, MessagePage, UserPage};

/// Largest page the Slack list endpoints accept without complaint.
pub const PAGE_LIMIT: u32 = 200;

/// Parameters for one `conversations.history` call.
#[derive(Debug, Clone, Copy)]
pub struct HistoryRequest<'a> {
    pub channel_id: &'a str,
    /// Only messages strictly after this timestamp.
    pub oldest: Option<&'a SlackTs>,
    pub cursor: Option<&'a str>,
    pub limit: u32,
}

/// The slice of the Slack Web API the archiver consumes. Calls block until
/// the response arrives or the client times out.
pub trait SlackApi {
    fn auth_test(&self) -> Result<AuthInfo, SlackError>;

    fn list_channels(&self, cursor: Option<&str>) -> Result<ChannelPage, SlackError>;

    fn history(&self, req: &HistoryRequest<'_>) -> Result<MessagePage, SlackError>;

    fn replies(
        &self,
        channel_id: &str,
        thread_ts: &SlackTs,
        cursor: Option<&str>,
    ) -> Result<MessagePage, SlackError>;

    fn list_users(&self, cursor: Option<&str>) -> Result<UserPage, SlackError>;

    fn list_emoji(&self) -> Result<EmojiList, SlackError>;

    /// Raw bytes of a media URL. `authenticated` adds the bearer token, which
    /// private file URLs require and public CDN URLs do not.
    fn download(&self, url: &str, authenticated: bool) -> Result<Vec<u8>, SlackError>;
}

/// Finds a channel id by name, paging through `conversations.list`.
pub fn find_channel_id<A: SlackApi + ?Sized>(
    api: &A,
    name: &str,
) -> Result<Option<String>, SlackError> {
    let mut cursor: Option<String> = None;
    loop {
        let page = api.list_channels(cursor.as_deref())?;
        if let Some(channel) = page.channels.iter().find(|c| c.name == name) {
            return Ok(Some(channel.id.clone()));
        }
        match page.next_cursor() {
            Some(next) => cursor = Some(next.to_string()),
            None => return Ok(None),
        }
    }
}
