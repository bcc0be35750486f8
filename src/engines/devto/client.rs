use crate::constants::{
    DEFAULT_REQUEST_TIMEOUT, DEVTO_BASE_URL, DEVTO_ENGINE, DEVTO_HOST, DEVTO_PAGE_SIZE,
    UPSTREAM_BODY_SNIPPET, USER_AGENT,
};
use crate::context::Context;
use crate::error::{ImportError, Result};
use crate::metrics::MetricName;
use chrono::{DateTime, FixedOffset};
use metrics::counter;
use reqwest::header::{ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEVTO_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Article record as returned by the dev.to API. Summaries from the list
/// endpoint leave `body_markdown` empty.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DevToArticle {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_markdown: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub published_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub edited_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "tag_list")]
    pub tag_list: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
}

fn null_as_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null`, missing and `""` all mean "no timestamp".
fn optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// `tag_list` comes either as `["rust", "web"]` or as `"rust, web"`.
fn tag_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTags {
        List(Vec<String>),
        Csv(String),
    }

    let tags = match Option::<RawTags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawTags::List(list)) => list,
        Some(RawTags::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
    };

    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

/// HTTP client for the public dev.to API.
#[derive(Debug, Clone)]
pub struct DevToClient {
    base_url: String,
    request_timeout: Duration,
    http: reqwest::Client,
}

impl Default for DevToClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DevToClient {
    pub fn new() -> Self {
        Self::with_settings(ClientSettings::default())
    }

    pub fn with_settings(settings: ClientSettings) -> Self {
        // Timeouts are applied per request so they can be clamped to the
        // caller's deadline.
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            request_timeout: settings.request_timeout,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List article summaries for a user (no bodies).
    #[instrument(skip(self, ctx))]
    pub async fn get_articles_by_username(
        &self,
        ctx: &Context,
        username: &str,
    ) -> Result<Vec<DevToArticle>> {
        if username.trim().is_empty() {
            return Err(ImportError::invalid_argument("username cannot be empty"));
        }

        let mut endpoint = Url::parse(&format!("{}/articles", self.base_url))
            .map_err(|e| ImportError::invalid_argument(format!("invalid base URL: {e}")))?;
        endpoint
            .query_pairs_mut()
            .append_pair("username", username)
            .append_pair("per_page", DEVTO_PAGE_SIZE);

        self.get_json(ctx, endpoint.as_str())
            .await
            .map_err(|e| e.context(format!("failed to fetch articles for user {username}")))
    }

    /// Fetch one full article, including `body_markdown`.
    #[instrument(skip(self, ctx))]
    pub async fn get_article_by_id(&self, ctx: &Context, id: u64) -> Result<DevToArticle> {
        if id == 0 {
            return Err(ImportError::invalid_argument(format!(
                "invalid article ID: {id}"
            )));
        }

        let endpoint = format!("{}/articles/{}", self.base_url, id);
        self.get_json(ctx, &endpoint)
            .await
            .map_err(|e| e.context(format!("failed to fetch article {id}")))
    }

    pub async fn get_article_by_url(&self, ctx: &Context, article_url: &str) -> Result<DevToArticle> {
        let id = extract_article_id(article_url)?;
        self.get_article_by_id(ctx, id).await
    }

    async fn get_json<T: DeserializeOwned>(&self, ctx: &Context, url: &str) -> Result<T> {
        let timeout = match ctx.remaining() {
            Some(left) => left.min(self.request_timeout),
            None => self.request_timeout,
        };

        debug!(%url, ?timeout, "GET");
        ctx.run(async {
            let resp = self
                .http
                .get(url)
                .header(ACCEPT, "application/json")
                .header(USER_AGENT_HEADER, USER_AGENT)
                .timeout(timeout)
                .send()
                .await?;

            let status = resp.status();
            counter!(
                MetricName::UpstreamRequests.as_str(),
                "engine" => DEVTO_ENGINE,
                "status" => status.as_u16().to_string()
            )
            .increment(1);

            let body = resp.bytes().await?;
            if status != StatusCode::OK {
                let snippet = &body[..body.len().min(UPSTREAM_BODY_SNIPPET)];
                return Err(ImportError::Upstream {
                    status: Some(status.as_u16()),
                    message: format!(
                        "API returned status {}: {}",
                        status.as_u16(),
                        String::from_utf8_lossy(snippet)
                    ),
                });
            }

            serde_json::from_slice(&body)
                .map_err(|e| ImportError::upstream(format!("failed to decode response: {e}")))
        })
        .await
    }
}

/// Pull the numeric article id out of a URL like
/// `https://dev.to/alice/my-post-12345`.
pub fn extract_article_id(article_url: &str) -> Result<u64> {
    let parsed = Url::parse(article_url)
        .map_err(|e| ImportError::invalid_argument(format!("invalid URL: {e}")))?;

    let host = parsed.host_str().unwrap_or_default();
    if !host.contains(DEVTO_HOST) {
        return Err(ImportError::invalid_argument(format!(
            "not a dev.to URL: {article_url}"
        )));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let slug = segments.last().ok_or_else(|| {
        ImportError::invalid_argument(format!("invalid dev.to article URL format: {article_url}"))
    })?;

    let candidate = slug.rsplit('-').next().unwrap_or(slug);
    match candidate.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ImportError::invalid_argument(format!(
            "could not parse article ID from URL: {article_url}"
        ))),
    }
}
