use std::process::ExitCode;

use tracing::{error, info};

use slackvault_db::Database;
use slackvault_slack::SlackClient;
use slackvault_sync::{ArchiveConfig, SyncError, run_archive};

fn main() -> anyhow::Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slackvault_archiver=info,slackvault_sync=info,slackvault_slack=info,slackvault_db=info".into()),
        )
        .init();

    // Config
    let config = ArchiveConfig::from_env()?;
    if config.token.is_empty() {
        eprintln!("FATAL: SLACK_TOKEN is not set.");
        eprintln!("       Export a user token (xoxp-...) or put it in your .env file.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let db = Database::open(&config.db_path())?;
    let client = SlackClient::new(&config.token, &config.api_base, config.http_timeout)?;

    match run_archive(&config, &client, &db) {
        Ok(summary) => {
            let report = &summary.report;
            info!(
                "Archive complete: #{} ({}), {} messages and {} replies in {} pages, {} users, {} emojis",
                report.channel,
                report.plan.label(),
                report.messages,
                report.replies,
                report.pages,
                summary.users,
                summary.emojis
            );
            if let Some(cursor) = &report.cursor {
                info!("Cursor: {} .. {}", cursor.oldest_ts, cursor.newest_ts);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Archive run aborted: {}", e);
            if let Some(hint) = failure_hint(&e) {
                error!("{}", hint);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// What the operator should do next, for failures with an obvious remedy.
fn failure_hint(err: &SyncError) -> Option<&'static str> {
    match err {
        SyncError::Slack(e) if e.is_auth() => {
            Some("Slack rejected SLACK_TOKEN; check that it is valid and has the history, users and emoji read scopes")
        }
        SyncError::Slack(e) if e.is_transient() => {
            Some("Network failure; the cursor was not advanced, so re-running resumes where this run stopped")
        }
        SyncError::ChannelNotFound(_) => {
            Some("Check SLACKVAULT_CHANNEL and that the token's user is a member of the channel")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use slackvault_slack::SlackError;

    use super::*;

    #[test]
    fn auth_failures_point_at_the_token() {
        let err = SyncError::Slack(SlackError::from_code("auth.test", "invalid_auth"));
        assert!(failure_hint(&err).unwrap().contains("SLACK_TOKEN"));
    }

    #[test]
    fn other_api_errors_have_no_hint() {
        let err = SyncError::Slack(SlackError::from_code("conversations.history", "fatal_error"));
        assert_eq!(failure_hint(&err), None);
        let err = SyncError::Storage(anyhow::anyhow!("disk full"));
        assert_eq!(failure_hint(&err), None);
    }

    #[test]
    fn missing_channel_hint() {
        let err = SyncError::ChannelNotFound("general".into());
        assert!(failure_hint(&err).unwrap().contains("SLACKVAULT_CHANNEL"));
    }
}
