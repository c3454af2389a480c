//! In-memory Slack workspace for sync tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use slackvault_slack::{HistoryRequest, SlackApi, SlackError};
use slackvault_types::SlackTs;
use slackvault_types::api::{
    AuthInfo, ChannelPage, EmojiList, MessagePage, ResponseMetadata, UserPage, WireChannel,
    WireMessage, WireUser,
};

pub const CHANNEL: &str = "general";
pub const CHANNEL_ID: &str = "C0GENERAL";

pub struct FakeSlack {
    pub page_size: usize,
    pub history: RefCell<Vec<WireMessage>>,
    pub threads: RefCell<HashMap<String, Vec<WireMessage>>>,
    pub users: Vec<WireUser>,
    pub emoji: BTreeMap<String, String>,
    pub blobs: HashMap<String, Vec<u8>>,
    /// Pretend the server ignores `oldest`.
    pub ignore_oldest: bool,
    /// Fail the Nth history call (0-based).
    pub fail_history_call: Option<usize>,
    pub history_calls: Cell<usize>,
    pub downloads: RefCell<Vec<(String, bool)>>,
    pub oldest_seen: RefCell<Vec<Option<String>>>,
}

impl FakeSlack {
    pub fn new() -> Self {
        Self {
            page_size: 50,
            history: RefCell::new(Vec::new()),
            threads: RefCell::new(HashMap::new()),
            users: Vec::new(),
            emoji: BTreeMap::new(),
            blobs: HashMap::new(),
            ignore_oldest: false,
            fail_history_call: None,
            history_calls: Cell::new(0),
            downloads: RefCell::new(Vec::new()),
            oldest_seen: RefCell::new(Vec::new()),
        }
    }

    /// Channel with `count` plain messages at seconds `start..start+count`.
    pub fn with_messages(start: i64, count: i64) -> Self {
        let fake = Self::new();
        for i in 0..count {
            fake.post(message(start + i));
        }
        fake
    }

    pub fn post(&self, msg: WireMessage) {
        self.history.borrow_mut().push(msg);
    }

    /// Adds a thread parent and its replies.
    pub fn post_thread(&self, secs: i64, reply_secs: &[i64]) {
        let mut parent = message(secs);
        parent.thread_ts = Some(parent.ts.clone());
        parent.reply_count = reply_secs.len() as u32;

        let mut thread = vec![parent.clone()];
        for r in reply_secs {
            let mut reply = message(*r);
            reply.thread_ts = Some(parent.ts.clone());
            thread.push(reply);
        }
        self.threads
            .borrow_mut()
            .insert(parent.ts.to_string(), thread);
        self.post(parent);
    }
}

pub fn ts(secs: i64) -> SlackTs {
    SlackTs::new(format!("{secs}.000100"))
}

pub fn message(secs: i64) -> WireMessage {
    WireMessage {
        ts: ts(secs),
        user: Some("U1".into()),
        text: format!("message {secs}"),
        ..Default::default()
    }
}

fn paginate(all: Vec<WireMessage>, cursor: Option<&str>, size: usize) -> MessagePage {
    let offset = cursor
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0)
        .min(all.len());
    let end = (offset + size).min(all.len());
    let next = if end < all.len() {
        end.to_string()
    } else {
        String::new()
    };
    MessagePage {
        messages: all[offset..end].to_vec(),
        response_metadata: Some(ResponseMetadata { next_cursor: next }),
    }
}

impl SlackApi for FakeSlack {
    fn auth_test(&self) -> Result<AuthInfo, SlackError> {
        Ok(AuthInfo {
            url: Some("https://acme.slack.com/".into()),
            team: Some("Acme".into()),
            user_id: Some("U1".into()),
        })
    }

    fn list_channels(&self, cursor: Option<&str>) -> Result<ChannelPage, SlackError> {
        // Two pages so lookup has to follow the cursor.
        let (channels, next) = match cursor {
            None => (
                vec![WireChannel { id: "C0RANDOM".into(), name: "random".into() }],
                "page2".to_string(),
            ),
            Some(_) => (
                vec![WireChannel { id: CHANNEL_ID.into(), name: CHANNEL.into() }],
                String::new(),
            ),
        };
        Ok(ChannelPage {
            channels,
            response_metadata: Some(ResponseMetadata { next_cursor: next }),
        })
    }

    fn history(&self, req: &HistoryRequest<'_>) -> Result<MessagePage, SlackError> {
        let call = self.history_calls.get();
        self.history_calls.set(call + 1);
        if self.fail_history_call == Some(call) {
            return Err(SlackError::from_code("conversations.history", "ratelimited"));
        }
        if req.channel_id != CHANNEL_ID {
            return Err(SlackError::from_code("conversations.history", "channel_not_found"));
        }
        self.oldest_seen
            .borrow_mut()
            .push(req.oldest.map(|t| t.to_string()));

        let mut all: Vec<WireMessage> = self
            .history
            .borrow()
            .iter()
            .filter(|m| self.ignore_oldest || req.oldest.is_none_or(|o| m.ts > *o))
            .cloned()
            .collect();
        all.sort_by(|a, b| b.ts.cmp(&a.ts));
        Ok(paginate(all, req.cursor, self.page_size.min(req.limit as usize)))
    }

    fn replies(
        &self,
        _channel_id: &str,
        thread_ts: &SlackTs,
        cursor: Option<&str>,
    ) -> Result<MessagePage, SlackError> {
        let thread = self
            .threads
            .borrow()
            .get(thread_ts.as_str())
            .cloned()
            .ok_or_else(|| SlackError::from_code("conversations.replies", "thread_not_found"))?;
        // Slack returns the parent first, then replies oldest-first.
        Ok(paginate(thread, cursor, 2))
    }

    fn list_users(&self, _cursor: Option<&str>) -> Result<UserPage, SlackError> {
        Ok(UserPage {
            members: self.users.clone(),
            response_metadata: None,
        })
    }

    fn list_emoji(&self) -> Result<EmojiList, SlackError> {
        Ok(EmojiList {
            emoji: self.emoji.clone(),
        })
    }

    fn download(&self, url: &str, authenticated: bool) -> Result<Vec<u8>, SlackError> {
        self.downloads
            .borrow_mut()
            .push((url.to_string(), authenticated));
        self.blobs.get(url).cloned().ok_or_else(|| SlackError::Api {
            method: "download".into(),
            code: "404 Not Found".into(),
        })
    }
}
