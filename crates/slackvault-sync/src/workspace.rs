use tracing::info;

use slackvault_db::{Database, WORKSPACE_URL_KEY};
use slackvault_slack::SlackApi;
use slackvault_types::api::AuthInfo;
use slackvault_types::models::{EmojiDef, User};

use crate::error::SyncError;
use crate::media::MediaStore;

/// Checks the token and remembers the workspace URL for permalinks.
pub fn record_workspace<A: SlackApi + ?Sized>(
    api: &A,
    db: &Database,
) -> Result<AuthInfo, SyncError> {
    let auth = api.auth_test()?;
    if let Some(url) = auth.url.as_deref().filter(|u| !u.is_empty()) {
        db.set_config(WORKSPACE_URL_KEY, url)?;
    }
    info!(
        "Authenticated to {}",
        auth.team.as_deref().unwrap_or("workspace")
    );
    Ok(auth)
}

/// Stores every custom emoji. Aliases are kept as pointers; images are
/// downloaded once.
pub fn sync_emojis<A: SlackApi + ?Sized>(
    api: &A,
    db: &Database,
    media: &MediaStore,
) -> Result<usize, SyncError> {
    info!("Syncing custom emojis...");
    let list = api.list_emoji()?;

    for (name, value) in &list.emoji {
        let mut emoji = EmojiDef::parse(name, value);
        media.fetch_emoji(api, &mut emoji);
        db.upsert_emoji(&emoji)?;
    }

    info!("Synced {} custom emojis", list.emoji.len());
    Ok(list.emoji.len())
}

/// Upserts every workspace member, downloading avatars that are not on disk.
pub fn sync_users<A: SlackApi + ?Sized>(
    api: &A,
    db: &Database,
    media: &MediaStore,
) -> Result<usize, SyncError> {
    info!("Syncing users...");
    let mut count = 0;
    let mut cursor: Option<String> = None;

    loop {
        let page = api.list_users(cursor.as_deref())?;
        for wire in &page.members {
            let mut user = User::from_wire(wire);
            media.fetch_avatar(api, &mut user);
            db.upsert_user(&user)?;
            count += 1;
        }
        match page.next_cursor() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    info!("Synced {} users", count);
    Ok(count)
}
