use std::path::PathBuf;

use thiserror::Error;

use slackvault_slack::SlackError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Slack(#[from] SlackError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("channel #{0} not found")]
    ChannelNotFound(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
