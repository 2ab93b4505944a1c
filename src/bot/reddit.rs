//! Reddit client: OAuth session, comment stream, reply submission.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bot::Error;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A comment from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub body: String,
    /// `[deleted]` when the account is gone.
    pub author: String,
}

impl Comment {
    /// Reddit usernames are case-insensitive.
    pub fn is_authored_by(&self, username: &str) -> bool {
        self.author.eq_ignore_ascii_case(username)
    }
}

/// Pulls a bounded window of recent comments.
#[allow(async_fn_in_trait)]
pub trait StreamWatcher {
    async fn poll(&self, limit: usize) -> Result<Vec<Comment>, Error>;
}

/// Posts a reply under a comment.
#[allow(async_fn_in_trait)]
pub trait ReplyTransport {
    async fn reply(&self, comment: &Comment, text: &str) -> Result<(), Error>;
}

/// Script-app credentials for the password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
    error: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

/// Falls back to the default lifetime when `expires_in` overflows the clock.
fn token_expiry(now: Instant, expires_in: u64) -> Instant {
    now.checked_add(Duration::from_secs(expires_in))
        .unwrap_or_else(|| now + Duration::from_secs(default_expires_in()))
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<Thing>,
}

#[derive(Deserialize)]
struct Thing {
    kind: String,
    data: CommentData,
}

#[derive(Deserialize)]
struct CommentData {
    id: String,
    #[serde(default)]
    body: String,
    author: Option<String>,
}

#[derive(Deserialize)]
struct CommentResponse {
    json: CommentResponseBody,
}

#[derive(Deserialize)]
struct CommentResponseBody {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Authenticated Reddit API client.
pub struct RedditClient {
    http: reqwest::Client,
    credentials: Credentials,
    stream: String,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    /// Create a client and log in once so bad credentials surface at startup.
    pub async fn login(http: reqwest::Client, credentials: Credentials, subreddit: &str) -> Result<Self, Error> {
        info!("Logging in as u/{}...", credentials.username);
        let client = Self {
            http,
            credentials,
            stream: subreddit.to_string(),
            token: Mutex::new(None),
        };
        client.access_token().await?;
        info!("Successfully logged in.");
        Ok(client)
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Cached token, refreshed when close to expiry.
    async fn access_token(&self) -> Result<String, Error> {
        let mut token = self.token.lock().await;
        if let Some(t) = token.as_ref()
            && t.is_fresh()
        {
            return Ok(t.value.clone());
        }

        debug!("Requesting new access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("{status}: {body}")));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse token response: {e}")))?;

        // Reddit answers bad credentials with 200 and an error field
        if let Some(error) = parsed.error {
            return Err(Error::Auth(error));
        }
        let value = parsed
            .access_token
            .ok_or_else(|| Error::Auth("no access_token in response".into()))?;

        *token = Some(AccessToken {
            value: value.clone(),
            expires_at: token_expiry(Instant::now(), parsed.expires_in),
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

impl StreamWatcher for RedditClient {
    async fn poll(&self, limit: usize) -> Result<Vec<Comment>, Error> {
        let token = self
            .access_token()
            .await
            .map_err(|e| Error::StreamUnavailable(e.to_string()))?;

        let url = format!("{API_BASE}/r/{}/comments", self.stream);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await
            .map_err(|e| Error::StreamUnavailable(format!("HTTP error: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
        }
        if !status.is_success() {
            return Err(Error::StreamUnavailable(format!("r/{} returned {status}", self.stream)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::StreamUnavailable(format!("Failed to read response: {e}")))?;
        let comments = parse_listing(&body)?;
        debug!("Polled {} comment(s) from r/{}", comments.len(), self.stream);
        Ok(comments)
    }
}

impl ReplyTransport for RedditClient {
    async fn reply(&self, comment: &Comment, text: &str) -> Result<(), Error> {
        let failure = |reason: String| Error::ReplyTransport {
            comment_id: comment.id.clone(),
            reason,
        };

        let token = self.access_token().await.map_err(|e| failure(e.to_string()))?;
        let thing_id = format!("t1_{}", comment.id);

        let response = self
            .http
            .post(format!("{API_BASE}/api/comment"))
            .bearer_auth(token)
            .form(&[("api_type", "json"), ("thing_id", thing_id.as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| failure(format!("HTTP error: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failure(format!("{status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| failure(format!("Failed to read response: {e}")))?;
        check_comment_response(&body).map_err(|reason| {
            warn!("Reddit rejected reply to {}: {}", comment.id, reason);
            failure(reason)
        })
    }
}

/// Map a comment listing to [`Comment`]s, skipping anything that is not a comment.
pub fn parse_listing(body: &str) -> Result<Vec<Comment>, Error> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|e| Error::StreamUnavailable(format!("Failed to parse listing: {e}")))?;

    Ok(listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t1")
        .map(|thing| Comment {
            id: thing.data.id,
            body: thing.data.body,
            author: thing.data.author.unwrap_or_else(|| "[deleted]".to_string()),
        })
        .collect())
}

/// `/api/comment` answers 200 even when it refuses; errors live in `json.errors`.
fn check_comment_response(body: &str) -> Result<(), String> {
    let parsed: CommentResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response: {e}"))?;
    if parsed.json.errors.is_empty() {
        Ok(())
    } else {
        let errors: Vec<String> = parsed.json.errors.iter().map(|e| e.to_string()).collect();
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing() {
        let body = r#"{
            "kind": "Listing",
            "data": {
                "after": "t1_abc",
                "children": [
                    {"kind": "t1", "data": {"id": "abc", "body": "so ephemeral", "author": "alice"}},
                    {"kind": "t1", "data": {"id": "def", "body": "[removed]", "author": null}},
                    {"kind": "more", "data": {"id": "ghi", "children": []}}
                ]
            }
        }"#;

        let comments = parse_listing(body).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "abc");
        assert_eq!(comments[0].body, "so ephemeral");
        assert_eq!(comments[0].author, "alice");
        assert_eq!(comments[1].author, "[deleted]");
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        let err = parse_listing("<html>down for maintenance</html>").unwrap_err();
        assert!(matches!(err, Error::StreamUnavailable(_)));
    }

    #[test]
    fn test_comment_response_ok() {
        let body = r#"{"json": {"errors": [], "data": {"things": []}}}"#;
        assert!(check_comment_response(body).is_ok());
    }

    #[test]
    fn test_comment_response_errors() {
        let body = r#"{"json": {"errors": [["RATELIMIT", "you are doing that too much", "ratelimit"]]}}"#;
        let err = check_comment_response(body).unwrap_err();
        assert!(err.contains("RATELIMIT"));
    }

    #[test]
    fn test_token_expiry() {
        let now = Instant::now();
        assert_eq!(token_expiry(now, 3600), now + Duration::from_secs(3600));
        assert_eq!(token_expiry(now, u64::MAX), now + Duration::from_secs(3600));
    }

    #[test]
    fn test_is_authored_by_ignores_case() {
        let comment = Comment {
            id: "abc".into(),
            body: "hello".into(),
            author: "WotD_Bot".into(),
        };
        assert!(comment.is_authored_by("wotd_bot"));
        assert!(!comment.is_authored_by("someone_else"));
    }
}
