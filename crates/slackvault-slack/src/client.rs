use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use slackvault_types::SlackTs;
use slackvault_types::api::{
    ApiStatus, AuthInfo, ChannelPage, EmojiList, MessagePage, UserPage,
};

use crate::{HistoryRequest, PAGE_LIMIT, SlackApi, SlackError};

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Blocking Slack Web API client. One bearer token, one base URL.
pub struct SlackClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> Result<Self, SlackError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slackvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SlackError::Network {
                method: "client".into(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let url = format!("{}/{}", self.base_url, method);
        debug!("GET {} {:?}", method, query);

        let req = self.http.get(&url).bearer_auth(&self.token).query(query);
        let body = self.send(method, req)?;

        let status: ApiStatus = serde_json::from_slice(&body).map_err(|e| SlackError::Malformed {
            method: method.to_string(),
            detail: e.to_string(),
        })?;
        if !status.ok {
            let code = status.error.unwrap_or_else(|| "unknown_error".into());
            return Err(SlackError::from_code(method, &code));
        }

        serde_json::from_slice(&body).map_err(|e| SlackError::Malformed {
            method: method.to_string(),
            detail: e.to_string(),
        })
    }

    fn send(&self, method: &str, req: RequestBuilder) -> Result<Vec<u8>, SlackError> {
        let network = |source| SlackError::Network {
            method: method.to_string(),
            source,
        };

        let resp = req.send().map_err(network)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SlackError::Auth {
                method: method.to_string(),
                code: status.to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SlackError::from_code(method, "ratelimited"));
        }
        if !status.is_success() {
            return Err(SlackError::Api {
                method: method.to_string(),
                code: status.to_string(),
            });
        }

        Ok(resp.bytes().map_err(network)?.to_vec())
    }
}

impl SlackApi for SlackClient {
    fn auth_test(&self) -> Result<AuthInfo, SlackError> {
        self.call("auth.test", &[])
    }

    fn list_channels(&self, cursor: Option<&str>) -> Result<ChannelPage, SlackError> {
        let mut query = vec![
            ("types", "public_channel,private_channel".to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        self.call("conversations.list", &query)
    }

    fn history(&self, req: &HistoryRequest<'_>) -> Result<MessagePage, SlackError> {
        let mut query = vec![
            ("channel", req.channel_id.to_string()),
            ("limit", req.limit.to_string()),
        ];
        if let Some(oldest) = req.oldest {
            query.push(("oldest", oldest.to_string()));
        }
        if let Some(c) = req.cursor {
            query.push(("cursor", c.to_string()));
        }
        self.call("conversations.history", &query)
    }

    fn replies(
        &self,
        channel_id: &str,
        thread_ts: &SlackTs,
        cursor: Option<&str>,
    ) -> Result<MessagePage, SlackError> {
        let mut query = vec![
            ("channel", channel_id.to_string()),
            ("ts", thread_ts.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        self.call("conversations.replies", &query)
    }

    fn list_users(&self, cursor: Option<&str>) -> Result<UserPage, SlackError> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }
        self.call("users.list", &query)
    }

    fn list_emoji(&self) -> Result<EmojiList, SlackError> {
        self.call("emoji.list", &[])
    }

    fn download(&self, url: &str, authenticated: bool) -> Result<Vec<u8>, SlackError> {
        let mut req = self.http.get(url);
        if authenticated {
            req = req.bearer_auth(&self.token);
        }
        self.send("download", req)
    }
}
