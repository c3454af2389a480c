use tracing::debug;

use slackvault_slack::{HistoryRequest, PAGE_LIMIT, SlackApi, SlackError};
use slackvault_types::api::WireMessage;
use slackvault_types::sync::{Direction, SyncPlan};

/// One page of channel history.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Sorted to match the walk direction; never includes anything at or
    /// below the plan's lower bound.
    pub messages: Vec<WireMessage>,
    /// Continuation cursor for the following page, if there is one.
    pub next_cursor: Option<String>,
}

/// Lazily walks `conversations.history` for one channel.
///
/// Each `next()` issues exactly one request. The iterator ends when the API
/// stops handing out a continuation cursor, or right after yielding an
/// error.
pub struct HistoryPages<'a, A: SlackApi + ?Sized> {
    api: &'a A,
    channel_id: &'a str,
    plan: &'a SyncPlan,
    limit: u32,
    cursor: Option<String>,
    done: bool,
}

impl<'a, A: SlackApi + ?Sized> HistoryPages<'a, A> {
    pub fn new(api: &'a A, channel_id: &'a str, plan: &'a SyncPlan) -> Self {
        Self {
            api,
            channel_id,
            plan,
            limit: PAGE_LIMIT,
            cursor: None,
            done: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, PAGE_LIMIT);
        self
    }
}

impl<A: SlackApi + ?Sized> Iterator for HistoryPages<'_, A> {
    type Item = Result<Batch, SlackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let plan: &SyncPlan = self.plan;
        let bound = plan.lower_bound();
        let req = HistoryRequest {
            channel_id: self.channel_id,
            oldest: bound,
            cursor: self.cursor.as_deref(),
            limit: self.limit,
        };

        let page = match self.api.history(&req) {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let next_cursor = page.next_cursor().map(str::to_string);
        self.done = next_cursor.is_none();
        self.cursor = next_cursor.clone();

        let mut messages = page.messages;
        if let Some(after) = bound {
            messages.retain(|m| m.ts > *after);
        }
        match plan.direction() {
            Direction::Backward => messages.sort_by(|a, b| b.ts.cmp(&a.ts)),
            Direction::Forward => messages.sort_by(|a, b| a.ts.cmp(&b.ts)),
        }

        debug!(
            "History page: {} messages, more={}",
            messages.len(),
            next_cursor.is_some()
        );
        Some(Ok(Batch {
            messages,
            next_cursor,
        }))
    }
}
