use thiserror::Error;

/// Error codes Slack returns when the token itself is the problem.
const AUTH_ERROR_CODES: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
    "no_permission",
    "missing_scope",
    "not_allowed_token_type",
    "ekm_access_denied",
];

/// Every variant aborts the current sync run; none is retried.
#[derive(Debug, Error)]
pub enum SlackError {
    /// Credential missing, invalid, revoked or lacking scope.
    #[error("{method}: authentication failed ({code})")]
    Auth { method: String, code: String },

    /// Transport failure or timeout. Safe to re-run later.
    #[error("{method}: request failed: {source}")]
    Network {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body did not have the expected shape.
    #[error("{method}: unexpected response: {detail}")]
    Malformed { method: String, detail: String },

    /// Any other `ok: false` code or non-success HTTP status.
    #[error("{method}: API error ({code})")]
    Api { method: String, code: String },
}

impl SlackError {
    /// Maps an `ok: false` error code to the matching variant.
    pub fn from_code(method: &str, code: &str) -> Self {
        if AUTH_ERROR_CODES.contains(&code) {
            Self::Auth {
                method: method.to_string(),
                code: code.to_string(),
            }
        } else {
            Self::Api {
                method: method.to_string(),
                code: code.to_string(),
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_codes_are_classified() {
        assert!(SlackError::from_code("users.list", "invalid_auth").is_auth());
        assert!(SlackError::from_code("users.list", "missing_scope").is_auth());
        let other = SlackError::from_code("conversations.history", "channel_not_found");
        assert!(!other.is_auth());
        assert_eq!(
            other.to_string(),
            "conversations.history: API error (channel_not_found)"
        );
    }
}
