use tracing::{debug, info};

use slackvault_db::Database;
use slackvault_slack::{PAGE_LIMIT, SlackApi};
use slackvault_types::models::MessageRecord;
use slackvault_types::sync::{SyncCursor, SyncPlan, SyncReport, TsRange};

use crate::error::SyncError;
use crate::fetcher::HistoryPages;
use crate::media::MediaStore;
use crate::threads::ThreadExpander;

/// Drives one sync pass of a channel.
///
/// The persisted cursor picks the plan: no cursor means a full backfill,
/// otherwise only messages newer than `newest_ts` are fetched. Each page is
/// written in one transaction, then its threads are expanded. The cursor is
/// written last and only when the whole run succeeded, so an aborted run is
/// simply repeated next time.
pub struct SyncController<'a, A: SlackApi + ?Sized> {
    api: &'a A,
    db: &'a Database,
    media: &'a MediaStore,
    page_limit: u32,
}

impl<'a, A: SlackApi + ?Sized> SyncController<'a, A> {
    pub fn new(api: &'a A, db: &'a Database, media: &'a MediaStore) -> Self {
        Self {
            api,
            db,
            media,
            page_limit: PAGE_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn plan(&self, channel: &str) -> Result<SyncPlan, SyncError> {
        let cursor = self.db.get_cursor(channel)?;
        Ok(SyncPlan::from_cursor(cursor.as_ref()))
    }

    pub fn run_sync(&self, channel: &str, channel_id: &str) -> Result<SyncReport, SyncError> {
        let prior = self.db.get_cursor(channel)?;
        let plan = SyncPlan::from_cursor(prior.as_ref());
        match plan.lower_bound() {
            Some(after) => info!("#{}: fetching messages newer than {}", channel, after),
            None => info!("#{}: performing full backfill", channel),
        }

        let expander = ThreadExpander::new(self.api, self.db, self.media, channel, channel_id);
        let mut observed: Option<TsRange> = None;
        let mut pages = 0;
        let mut messages = 0;
        let mut replies = 0;

        for batch in HistoryPages::new(self.api, channel_id, &plan).with_limit(self.page_limit) {
            let batch = batch?;

            let mut records = Vec::with_capacity(batch.messages.len());
            for wire in batch.messages.iter().filter(|m| !m.is_membership_notice()) {
                let mut record = MessageRecord::from_wire(channel, wire);
                self.media.fetch_files(self.api, &mut record.files);
                TsRange::observe(&mut observed, &record.message.ts);
                records.push(record);
            }
            self.db.save_messages(&records)?;

            for record in records.iter().filter(|r| r.message.has_replies()) {
                replies += expander.expand_thread(&record.message)?;
            }

            pages += 1;
            messages += records.len();
            debug!("#{}: {} messages so far", channel, messages);
        }

        let cursor = match observed {
            Some(range) => {
                let cursor = SyncCursor::merged(channel, Some(channel_id), prior.as_ref(), &range);
                self.db.put_cursor(&cursor)?;
                Some(cursor)
            }
            None => prior,
        };

        info!(
            "#{}: {} done, {} messages, {} thread replies",
            channel,
            plan.label(),
            messages,
            replies
        );

        Ok(SyncReport {
            channel: channel.to_string(),
            plan,
            pages,
            messages,
            replies,
            cursor,
        })
    }
}
