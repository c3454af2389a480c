use tracing::debug;

use slackvault_db::Database;
use slackvault_slack::SlackApi;
use slackvault_types::models::{Message, MessageRecord};

use crate::error::SyncError;
use crate::media::MediaStore;

/// Pulls the replies of thread parents and stores them under the parent.
pub struct ThreadExpander<'a, A: SlackApi + ?Sized> {
    api: &'a A,
    db: &'a Database,
    media: &'a MediaStore,
    channel: &'a str,
    channel_id: &'a str,
}

impl<'a, A: SlackApi + ?Sized> ThreadExpander<'a, A> {
    pub fn new(
        api: &'a A,
        db: &'a Database,
        media: &'a MediaStore,
        channel: &'a str,
        channel_id: &'a str,
    ) -> Self {
        Self {
            api,
            db,
            media,
            channel,
            channel_id,
        }
    }

    /// Fetches every reply of `parent` and upserts them with `thread_ts`
    /// pointing at the parent. Returns the number of replies stored; a
    /// message without replies is a no-op.
    pub fn expand_thread(&self, parent: &Message) -> Result<usize, SyncError> {
        if !parent.has_replies() {
            return Ok(0);
        }

        let mut records = Vec::with_capacity(parent.reply_count as usize);
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .api
                .replies(self.channel_id, &parent.ts, cursor.as_deref())?;

            for wire in &page.messages {
                // The parent comes back as the first element of the thread
                if wire.ts == parent.ts || wire.is_membership_notice() {
                    continue;
                }
                let mut record = MessageRecord::from_wire(self.channel, wire);
                record.message = record.message.into_reply_of(&parent.ts);
                self.media.fetch_files(self.api, &mut record.files);
                records.push(record);
            }

            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        self.db.save_messages(&records)?;
        debug!("Thread {}: {} replies", parent.ts, records.len());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CHANNEL, CHANNEL_ID, FakeSlack, message, ts};

    fn setup() -> (tempfile::TempDir, Database, MediaStore) {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path()).unwrap();
        (dir, Database::open_in_memory().unwrap(), media)
    }

    fn parent_of(fake: &FakeSlack, secs: i64) -> Message {
        let wire = fake
            .history
            .borrow()
            .iter()
            .find(|m| m.ts == ts(secs))
            .cloned()
            .unwrap();
        Message::from_wire(CHANNEL, &wire)
    }

    #[test]
    fn replies_point_at_parent() {
        let (_dir, db, media) = setup();
        let fake = FakeSlack::new();
        fake.post_thread(100, &[101, 102, 103]);
        let parent = parent_of(&fake, 100);
        db.save_messages(&[MessageRecord {
            message: parent.clone(),
            reactions: vec![],
            files: vec![],
        }])
        .unwrap();

        let expander = ThreadExpander::new(&fake, &db, &media, CHANNEL, CHANNEL_ID);
        assert_eq!(expander.expand_thread(&parent).unwrap(), 3);

        let replies = db.get_thread_replies(parent.ts.as_str()).unwrap();
        assert_eq!(replies.len(), 3);
        assert!(
            replies
                .iter()
                .all(|r| r.thread_ts.as_deref() == Some(parent.ts.as_str()))
        );
    }

    #[test]
    fn expansion_is_idempotent() {
        let (_dir, db, media) = setup();
        let fake = FakeSlack::new();
        fake.post_thread(200, &[201, 202]);
        let parent = parent_of(&fake, 200);

        let expander = ThreadExpander::new(&fake, &db, &media, CHANNEL, CHANNEL_ID);
        expander.expand_thread(&parent).unwrap();
        expander.expand_thread(&parent).unwrap();

        assert_eq!(db.get_thread_replies(parent.ts.as_str()).unwrap().len(), 2);
    }

    #[test]
    fn message_without_replies_is_skipped() {
        let (_dir, db, media) = setup();
        let fake = FakeSlack::new();
        let plain = Message::from_wire(CHANNEL, &message(300));

        let expander = ThreadExpander::new(&fake, &db, &media, CHANNEL, CHANNEL_ID);
        // No thread registered in the fake, so any request would fail.
        assert_eq!(expander.expand_thread(&plain).unwrap(), 0);
    }
}
