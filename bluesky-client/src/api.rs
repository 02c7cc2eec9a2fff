use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use skyprune_core::{AppConfig, BlueskyApiError, CoreError, Post, Session};
use tracing::{debug, info};
use url::Url;

pub const POST_COLLECTION: &str = "app.bsky.feed.post";

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
const GET_AUTHOR_FEED: &str = "app.bsky.feed.getAuthorFeed";
const DELETE_RECORD: &str = "com.atproto.repo.deleteRecord";

#[derive(Debug, Clone, Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self {
            did: response.did,
            handle: response.handle,
            access_jwt: response.access_jwt,
            refresh_jwt: response.refresh_jwt,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorFeedPage {
    pub feed: Vec<FeedViewPost>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedViewPost {
    pub post: PostView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub author: ProfileViewBasic,
    pub record: PostRecord,
    pub like_count: Option<u64>,
    pub repost_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileViewBasic {
    pub did: String,
    #[serde(default)]
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    pub embed: Option<RecordEmbed>,
}

/// Embed as stored on the record (not the hydrated `#view` form).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum RecordEmbed {
    #[serde(rename = "app.bsky.embed.images")]
    Images {
        #[serde(default)]
        images: Vec<serde_json::Value>,
    },
    #[serde(rename = "app.bsky.embed.recordWithMedia")]
    RecordWithMedia { media: Box<RecordEmbed> },
    #[serde(other)]
    Other,
}

impl RecordEmbed {
    pub fn has_images(&self) -> bool {
        match self {
            RecordEmbed::Images { images } => !images.is_empty(),
            RecordEmbed::RecordWithMedia { media } => media.has_images(),
            RecordEmbed::Other => false,
        }
    }
}

impl From<PostView> for Post {
    fn from(view: PostView) -> Self {
        let has_image_embed = view
            .record
            .embed
            .as_ref()
            .map(RecordEmbed::has_images)
            .unwrap_or(false);

        Self {
            uri: view.uri,
            author_did: view.author.did,
            created_at: view.record.created_at,
            text: view.record.text,
            like_count: view.like_count.unwrap_or(0),
            repost_count: view.repost_count.unwrap_or(0),
            has_image_embed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct DeleteRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    rkey: &'a str,
}

/// XRPC error envelope: `{"error": "...", "message": "..."}`.
#[derive(Debug, Clone, Default, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a failed XRPC response to a structured error kind.
pub fn map_error_response(status: StatusCode, headers: &HeaderMap, body: &str) -> BlueskyApiError {
    let parsed: XrpcErrorBody = serde_json::from_str(body).unwrap_or_default();
    let error_name = parsed.error.unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());

    if status == StatusCode::TOO_MANY_REQUESTS || error_name == "RateLimitExceeded" {
        return BlueskyApiError::RateLimitExceeded {
            retry_after: retry_after_from_headers(headers),
        };
    }

    match error_name.as_str() {
        "ExpiredToken" => return BlueskyApiError::ExpiredToken,
        "AuthenticationRequired" | "AccountTakedown" | "InvalidToken" => {
            return BlueskyApiError::AuthenticationFailed { reason: message };
        }
        _ => {}
    }

    if status == StatusCode::UNAUTHORIZED {
        return BlueskyApiError::AuthenticationFailed { reason: message };
    }
    if status.is_server_error() {
        return BlueskyApiError::ServerError {
            status_code: status.as_u16(),
        };
    }

    BlueskyApiError::Xrpc {
        status_code: status.as_u16(),
        error: if error_name.is_empty() {
            "Unknown".to_string()
        } else {
            error_name
        },
        message,
    }
}

/// Seconds to wait, from `retry-after` or the `ratelimit-reset` epoch.
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<u64> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
    };

    if let Some(seconds) = header_u64("retry-after") {
        return Some(seconds);
    }
    header_u64("ratelimit-reset").map(|reset| {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        reset.saturating_sub(now)
    })
}

#[derive(Debug, Clone)]
pub struct BlueskyApiClient {
    http_client: Client,
    base_url: Url,
}

impl BlueskyApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        let base_url = Url::parse(&config.service_url).map_err(|e| CoreError::Internal {
            message: format!("Invalid service URL {}: {}", config.service_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, nsid: &str) -> Result<Url, CoreError> {
        self.base_url
            .join(&format!("xrpc/{}", nsid))
            .map_err(|e| CoreError::Internal {
                message: format!("Could not build URL for {}: {}", nsid, e),
            })
    }

    async fn send(&self, nsid: &str, request: RequestBuilder) -> Result<Response, CoreError> {
        debug!("Sending XRPC request: {}", nsid);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Network error for {}: {}", nsid, e);
                if e.is_timeout() {
                    return Err(CoreError::BlueskyApi(BlueskyApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, nsid);
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let api_error = map_error_response(status, &headers, &body);

        // Callers report failures to the operator.
        debug!("Request failed with status {} for {}: {}", status, nsid, api_error);
        Err(CoreError::BlueskyApi(api_error))
    }

    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<SessionResponse, CoreError> {
        let url = self.endpoint(CREATE_SESSION)?;
        let request = self.http_client.post(url).json(&CreateSessionRequest {
            identifier,
            password,
        });

        let response = self.send(CREATE_SESSION, request).await.map_err(|e| match e {
            // Bad credentials come back as a 400/401 XRPC error.
            CoreError::BlueskyApi(BlueskyApiError::Xrpc { message, .. }) => {
                CoreError::BlueskyApi(BlueskyApiError::AuthenticationFailed { reason: message })
            }
            other => other,
        })?;

        let session: SessionResponse = response.json().await.map_err(|e| {
            debug!("Failed to parse session: {}", e);
            CoreError::BlueskyApi(BlueskyApiError::InvalidResponse {
                details: "Failed to parse session".to_string(),
            })
        })?;

        info!("Created session for {}", session.handle);
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_jwt: &str) -> Result<SessionResponse, CoreError> {
        let url = self.endpoint(REFRESH_SESSION)?;
        let request = self.http_client.post(url).bearer_auth(refresh_jwt);
        let response = self.send(REFRESH_SESSION, request).await?;

        let session: SessionResponse = response.json().await.map_err(|e| {
            debug!("Failed to parse refreshed session: {}", e);
            CoreError::BlueskyApi(BlueskyApiError::InvalidResponse {
                details: "Failed to parse refreshed session".to_string(),
            })
        })?;

        info!("Refreshed session for {}", session.handle);
        Ok(session)
    }

    pub async fn get_author_feed(
        &self,
        access_jwt: &str,
        actor: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<AuthorFeedPage, CoreError> {
        let url = self.endpoint(GET_AUTHOR_FEED)?;
        let limit = limit.to_string();
        let mut params = vec![("actor", actor), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }

        let request = self
            .http_client
            .get(url)
            .bearer_auth(access_jwt)
            .query(&params);
        let response = self.send(GET_AUTHOR_FEED, request).await?;

        let page: AuthorFeedPage = response.json().await.map_err(|e| {
            debug!("Failed to parse author feed: {}", e);
            CoreError::BlueskyApi(BlueskyApiError::InvalidResponse {
                details: format!("Failed to parse author feed for {}", actor),
            })
        })?;

        debug!(
            "Retrieved {} feed items (more: {})",
            page.feed.len(),
            page.cursor.is_some()
        );
        Ok(page)
    }

    pub async fn delete_record(
        &self,
        access_jwt: &str,
        repo: &str,
        rkey: &str,
    ) -> Result<(), CoreError> {
        let url = self.endpoint(DELETE_RECORD)?;
        let request = self
            .http_client
            .post(url)
            .bearer_auth(access_jwt)
            .json(&DeleteRecordRequest {
                repo,
                collection: POST_COLLECTION,
                rkey,
            });

        self.send(DELETE_RECORD, request).await?;
        debug!("Deleted record {}/{}", POST_COLLECTION, rkey);
        Ok(())
    }
}
