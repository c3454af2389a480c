use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::Local;
use minijinja::context;
use serde::Deserialize;
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use slackvault_db::{Database, WORKSPACE_URL_KEY};

use crate::templates::render_template;
use crate::views::{MessageView, ViewContext, build_views};

/// Messages per channel page and per "load more" request.
pub const PAGE_SIZE: u32 = 50;
pub const SEARCH_LIMIT: u32 = 100;

pub struct AppStateInner {
    pub db: Database,
    pub default_channel: String,
    /// Served under `/media`.
    pub data_dir: PathBuf,
}

pub type AppState = Arc<AppStateInner>;

pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(&state.data_dir);
    Router::new()
        .route("/", get(index))
        .route("/channel/{name}", get(channel_page))
        .route("/channel/{name}/load-more", get(load_more))
        .route("/api/thread/{ts}", get(thread))
        .route("/search", get(search))
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Exclusive upper bound: only messages older than this ts.
    pub before: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub channel: Option<String>,
}

struct Page {
    messages: Vec<MessageView>,
    has_more: bool,
    oldest_ts: Option<String>,
}

pub async fn index(State(state): State<AppState>) -> Redirect {
    Redirect::to(&format!("/channel/{}", state.default_channel))
}

pub async fn channel_page(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, StatusCode> {
    let name = channel.clone();
    let page = run_blocking(&state, move |db| {
        load_page(db, &name, query.before.as_deref())
    })
    .await?;

    let html = render(
        "channel.html",
        context! {
            channel,
            messages => page.messages,
            has_more => page.has_more,
            oldest_ts => page.oldest_ts,
        },
    )?;
    Ok(Html(html))
}

pub async fn load_more(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, StatusCode> {
    let Some(before) = query.before.filter(|b| !b.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing 'before' parameter" })),
        )
            .into_response());
    };

    let page = run_blocking(&state, move |db| load_page(db, &channel, Some(&before))).await?;
    let html = render("messages.html", context! { messages => page.messages })?;

    Ok(Json(json!({
        "html": html,
        "has_more": page.has_more,
        "oldest_ts": page.oldest_ts,
    }))
    .into_response())
}

pub async fn thread(
    State(state): State<AppState>,
    Path(ts): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let replies = run_blocking(&state, move |db| {
        let rows = db.get_thread_replies(&ts)?;
        let channel = rows.first().map(|r| r.channel.clone());
        let ctx = view_context(db, channel.as_deref(), false)?;
        build_views(db, rows, &ctx)
    })
    .await?;

    let count = replies.len();
    let html = render("thread.html", context! { messages => replies })?;
    Ok(Json(json!({ "html": html, "count": count })))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, StatusCode> {
    let q = query.q.trim().to_string();
    let channel = query.channel.filter(|c| !c.is_empty());

    let results = if q.is_empty() {
        Vec::new()
    } else {
        let (q, channel) = (q.clone(), channel.clone());
        run_blocking(&state, move |db| {
            let rows = db.search_messages(channel.as_deref(), &q, SEARCH_LIMIT)?;
            let ctx = view_context(db, channel.as_deref(), false)?;
            build_views(db, rows, &ctx)
        })
        .await?
    };

    let html = render(
        "search.html",
        context! {
            query => q,
            channel,
            messages => results,
            show_channel => true,
        },
    )?;
    Ok(Html(html))
}

// -- Helpers --

fn load_page(db: &Database, channel: &str, before: Option<&str>) -> anyhow::Result<Page> {
    let rows = db.get_messages(channel, before, None, PAGE_SIZE)?;
    let oldest_ts = rows.first().map(|r| r.ts.clone());
    let has_more = match &oldest_ts {
        Some(ts) => db.has_older(channel, ts)?,
        None => false,
    };

    let ctx = view_context(db, Some(channel), true)?;
    let messages = build_views(db, rows, &ctx)?;
    Ok(Page {
        messages,
        has_more,
        oldest_ts,
    })
}

fn view_context(
    db: &Database,
    channel: Option<&str>,
    dividers: bool,
) -> anyhow::Result<ViewContext<'static, Local>> {
    let channel_id = match channel {
        Some(name) => db.get_cursor(name)?.and_then(|c| c.channel_id),
        None => None,
    };
    Ok(ViewContext {
        tz: &Local,
        today: Local::now().date_naive(),
        workspace_url: db.get_config(WORKSPACE_URL_KEY)?,
        channel_id,
        dividers,
    })
}

/// Runs a DB closure off the async runtime.
async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Archive query failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn render<S: serde::Serialize>(name: &str, ctx: S) -> Result<String, StatusCode> {
    render_template(name, ctx).map_err(|e| {
        error!("Failed to render {}: {:#}", name, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
