use serde::{Deserialize, Serialize};

use crate::ts::SlackTs;

/// Persisted sync progress for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub channel: String,
    pub channel_id: Option<String>,
    pub oldest_ts: SlackTs,
    pub newest_ts: SlackTs,
}

impl SyncCursor {
    /// Widens `prior` (if any) with the bounds observed in a run.
    /// `newest_ts` never moves backward.
    pub fn merged(
        channel: &str,
        channel_id: Option<&str>,
        prior: Option<&SyncCursor>,
        observed: &TsRange,
    ) -> Self {
        let (oldest_ts, newest_ts) = match prior {
            Some(p) => (
                p.oldest_ts.clone().min(observed.oldest.clone()),
                p.newest_ts.clone().max(observed.newest.clone()),
            ),
            None => (observed.oldest.clone(), observed.newest.clone()),
        };

        Self {
            channel: channel.to_string(),
            channel_id: channel_id
                .map(str::to_string)
                .or_else(|| prior.and_then(|p| p.channel_id.clone())),
            oldest_ts,
            newest_ts,
        }
    }
}

/// Min/max timestamps seen during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsRange {
    pub oldest: SlackTs,
    pub newest: SlackTs,
}

impl TsRange {
    pub fn single(ts: &SlackTs) -> Self {
        Self {
            oldest: ts.clone(),
            newest: ts.clone(),
        }
    }

    /// Extends an optional range with one more timestamp.
    pub fn observe(range: &mut Option<TsRange>, ts: &SlackTs) {
        match range {
            None => *range = Some(Self::single(ts)),
            Some(r) => {
                if *ts < r.oldest {
                    r.oldest = ts.clone();
                }
                if *ts > r.newest {
                    r.newest = ts.clone();
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Newest first, from now back to the start of the channel.
    Backward,
    /// Oldest first, from a known bound up to now.
    Forward,
}

/// What a sync run is going to do, decided from the persisted cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SyncPlan {
    FullBackfill,
    IncrementalForward { after: SlackTs },
}

impl SyncPlan {
    pub fn from_cursor(cursor: Option<&SyncCursor>) -> Self {
        match cursor {
            None => Self::FullBackfill,
            Some(c) => Self::IncrementalForward {
                after: c.newest_ts.clone(),
            },
        }
    }

    /// Exclusive lower bound on message timestamps, if any.
    pub fn lower_bound(&self) -> Option<&SlackTs> {
        match self {
            Self::FullBackfill => None,
            Self::IncrementalForward { after } => Some(after),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::FullBackfill => Direction::Backward,
            Self::IncrementalForward { .. } => Direction::Forward,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FullBackfill => "full backfill",
            Self::IncrementalForward { .. } => "incremental",
        }
    }
}

/// Outcome of a completed sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub channel: String,
    pub plan: SyncPlan,
    pub pages: usize,
    pub messages: usize,
    pub replies: usize,
    /// Cursor as persisted after the run. `None` only if the channel has
    /// never produced a message.
    pub cursor: Option<SyncCursor>,
}
