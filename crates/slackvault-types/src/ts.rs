use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slack message timestamp, e.g. `"1700000000.000100"`.
///
/// Slack uses the timestamp as the message id within a channel. The string
/// form is kept verbatim (it is what the API expects back), but ordering is
/// numeric: seconds first, then the fractional part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlackTs(String);

impl SlackTs {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let (secs, micros) = self.parts()?;
        DateTime::from_timestamp(secs, (micros * 1_000) as u32)
    }

    fn parts(&self) -> Option<(i64, u64)> {
        let mut split = self.0.splitn(2, '.');
        let secs: i64 = split.next()?.parse().ok()?;
        let micros = match split.next() {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                // Right-pad / truncate to six digits so "1.5" == 500000us.
                let mut digits: String = frac.chars().take(6).collect();
                while digits.len() < 6 {
                    digits.push('0');
                }
                digits.parse().ok()?
            }
        };
        Some((secs, micros))
    }
}

impl Ord for SlackTs {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parts(), other.parts()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            // Malformed values sort before anything parseable.
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for SlackTs {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SlackTs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlackTs {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for SlackTs {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
