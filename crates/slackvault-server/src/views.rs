use std::collections::HashMap;

use anyhow::Result;
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use slackvault_db::Database;
use slackvault_db::models::{FileRow, MessageRow, ReactionRow, UserRow};
use slackvault_types::SlackTs;
use slackvault_types::models::ResolvedEmoji;

use crate::format::{date_divider, format_message_text, format_time, format_timestamp, local_date};

#[derive(Debug, Serialize)]
pub struct ReactionView {
    pub name: String,
    pub count: usize,
    /// Image to show instead of `:name:`, for custom emoji.
    pub image: Option<String>,
    pub users: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FileView {
    pub name: String,
    pub mimetype: String,
    pub href: String,
    pub is_image: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub ts: String,
    pub channel: String,
    pub user_id: String,
    pub author: String,
    pub avatar: Option<String>,
    pub html: String,
    pub time: String,
    pub timestamp: String,
    pub divider: Option<String>,
    pub reply_count: i64,
    pub reactions: Vec<ReactionView>,
    pub files: Vec<FileView>,
    pub permalink: Option<String>,
}

/// Where a page of messages is anchored, for permalinks and dividers.
pub struct ViewContext<'a, Tz: TimeZone> {
    pub tz: &'a Tz,
    pub today: NaiveDate,
    pub workspace_url: Option<String>,
    pub channel_id: Option<String>,
    /// Whether day dividers are emitted between messages.
    pub dividers: bool,
}

/// Joins message rows with their reactions, files, authors and emoji.
pub fn build_views<Tz>(
    db: &Database,
    rows: Vec<MessageRow>,
    ctx: &ViewContext<'_, Tz>,
) -> Result<Vec<MessageView>>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let ts_list: Vec<String> = rows.iter().map(|r| r.ts.clone()).collect();
    let users = db.get_users()?;
    let reactions = group_reactions(db.get_reactions_for_messages(&ts_list)?);
    let mut files = group_files(db.get_files_for_messages(&ts_list)?);
    let mut emoji_cache: HashMap<String, Option<String>> = HashMap::new();

    let mut views = Vec::with_capacity(rows.len());
    let mut last_date: Option<NaiveDate> = None;

    for row in rows {
        let ts = SlackTs::new(row.ts.clone());

        let divider = match local_date(&ts, ctx.tz) {
            Some(date) if ctx.dividers && last_date != Some(date) => {
                last_date = Some(date);
                Some(date_divider(date, ctx.today))
            }
            _ => None,
        };

        let mut reaction_views = Vec::new();
        for r in reactions.get(&row.ts).into_iter().flatten() {
            let image = match emoji_cache.get(&r.emoji_name) {
                Some(cached) => cached.clone(),
                None => {
                    let image = emoji_image(db.resolve_emoji(&r.emoji_name)?);
                    emoji_cache.insert(r.emoji_name.clone(), image.clone());
                    image
                }
            };
            reaction_views.push(ReactionView {
                name: r.emoji_name.clone(),
                count: r.user_ids.len(),
                image,
                users: r.user_ids.iter().map(|id| user_label(&users, id)).collect(),
            });
        }

        let file_views = files
            .remove(&row.ts)
            .unwrap_or_default()
            .into_iter()
            .map(file_view)
            .collect();

        views.push(MessageView {
            author: author_name(&row),
            avatar: row.avatar_local.as_ref().map(|p| media_href(p)),
            html: format_message_text(&row.text, &users),
            time: format_time(&ts, ctx.tz),
            timestamp: format_timestamp(&ts, ctx.tz),
            permalink: permalink(ctx, &row.ts),
            divider,
            reply_count: row.reply_count,
            reactions: reaction_views,
            files: file_views,
            user_id: row.user_id,
            channel: row.channel,
            ts: row.ts,
        });
    }

    Ok(views)
}

fn author_name(row: &MessageRow) -> String {
    row.display_name
        .as_deref()
        .or(row.user_name.as_deref())
        .filter(|n| !n.is_empty())
        .unwrap_or(&row.user_id)
        .to_string()
}

fn user_label(users: &HashMap<String, UserRow>, id: &str) -> String {
    users
        .get(id)
        .map(|u| u.display_name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn emoji_image(resolved: Option<ResolvedEmoji>) -> Option<String> {
    match resolved? {
        ResolvedEmoji::Custom {
            local_path: Some(path),
            ..
        } => Some(media_href(&path)),
        ResolvedEmoji::Custom { url, .. } => Some(url),
        ResolvedEmoji::Standard { .. } => None,
    }
}

fn file_view(row: FileRow) -> FileView {
    FileView {
        is_image: row.mimetype.starts_with("image/"),
        href: row
            .local_path
            .as_deref()
            .map(media_href)
            .unwrap_or(row.url),
        name: row.name,
        mimetype: row.mimetype,
    }
}

pub fn media_href(relative: &str) -> String {
    format!("/media/{}", relative.trim_start_matches('/'))
}

/// `https://team.slack.com/archives/C123/p1700000000000100`
fn permalink<Tz: TimeZone>(ctx: &ViewContext<'_, Tz>, ts: &str) -> Option<String> {
    let base = ctx.workspace_url.as_deref()?;
    let channel_id = ctx.channel_id.as_deref()?;
    Some(format!(
        "{}/archives/{}/p{}",
        base.trim_end_matches('/'),
        channel_id,
        ts.replace('.', "")
    ))
}

fn group_reactions(rows: Vec<ReactionRow>) -> HashMap<String, Vec<ReactionRow>> {
    let mut map: HashMap<String, Vec<ReactionRow>> = HashMap::new();
    for r in rows {
        map.entry(r.message_ts.clone()).or_default().push(r);
    }
    map
}

fn group_files(rows: Vec<FileRow>) -> HashMap<String, Vec<FileRow>> {
    let mut map: HashMap<String, Vec<FileRow>> = HashMap::new();
    for f in rows {
        map.entry(f.message_ts.clone()).or_default().push(f);
    }
    map
}
