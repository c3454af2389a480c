use tracing::info;

use slackvault_db::Database;
use slackvault_slack::{SlackApi, find_channel_id};
use slackvault_types::sync::SyncReport;

use crate::config::ArchiveConfig;
use crate::controller::SyncController;
use crate::error::SyncError;
use crate::media::MediaStore;
use crate::workspace::{record_workspace, sync_emojis, sync_users};

#[derive(Debug)]
pub struct ArchiveSummary {
    pub workspace_url: Option<String>,
    pub channel_id: String,
    pub emojis: usize,
    pub users: usize,
    pub report: SyncReport,
}

/// One complete archiver pass: workspace info, emojis, users, then the
/// channel's messages. Any API failure aborts the pass.
pub fn run_archive<A: SlackApi + ?Sized>(
    config: &ArchiveConfig,
    api: &A,
    db: &Database,
) -> Result<ArchiveSummary, SyncError> {
    let media = MediaStore::new(&config.data_dir)?;

    let auth = record_workspace(api, db)?;

    info!("Looking for #{} channel...", config.channel);
    let channel_id = find_channel_id(api, &config.channel)?
        .ok_or_else(|| SyncError::ChannelNotFound(config.channel.clone()))?;
    info!("Found channel: {}", channel_id);

    let emojis = sync_emojis(api, db, &media)?;
    let users = sync_users(api, db, &media)?;

    let report = SyncController::new(api, db, &media).run_sync(&config.channel, &channel_id)?;

    Ok(ArchiveSummary {
        workspace_url: auth.url,
        channel_id,
        emojis,
        users,
        report,
    })
}
