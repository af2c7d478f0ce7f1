//! HTTP gateway: routes, handlers and response rendering.
//!
//! Every endpoint validates one required query parameter, performs at most
//! one upstream call, and renders a flat JSON object or list. Responses for
//! the routes in [`CACHED_ROUTES`] are memoized by raw query string through
//! [`ResponseCache`]; the remaining routes always hit upstream live.

use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{
    Router,
    extract::{Query, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::task;

use crate::cache::{CacheKey, CachedResponse, ResponseCache};
use crate::config::GatewayConfig;
use crate::upstream::{MetadataClient, TranscriptClient, UpstreamError};

pub const CHANNEL_ROUTE: &str = "/channel";
pub const RECENT_VIDEO_ROUTE: &str = "/recentvid";
pub const STATS_ROUTE: &str = "/stats";
pub const TRANSCRIPT_ROUTE: &str = "/transcript";
pub const SEARCH_ROUTE: &str = "/search";
pub const PLAYLISTS_ROUTE: &str = "/playlists";
pub const RECOMMENDATIONS_ROUTE: &str = "/recommendations";
pub const COMMENTS_ROUTE: &str = "/comments";

/// The routes whose rendered responses are replayed from the cache. Search,
/// playlists, recommendations and comments stay live on every request.
const CACHED_ROUTES: [&str; 4] = [
    CHANNEL_ROUTE,
    RECENT_VIDEO_ROUTE,
    STATS_ROUTE,
    TRANSCRIPT_ROUTE,
];

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
const NO_TRANSCRIPT: &str = "No Transcript";
const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to fetch data from YouTube API";

#[derive(Clone)]
pub struct AppState {
    metadata: Arc<MetadataClient>,
    transcripts: Arc<TranscriptClient>,
    cache: Arc<ResponseCache>,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_cache(config, Arc::new(ResponseCache::new(config.cache_ttl)))
    }

    /// Builds the state around a caller-supplied cache so tests can inject
    /// one with a manual clock.
    pub fn with_cache(config: &GatewayConfig, cache: Arc<ResponseCache>) -> Self {
        Self {
            metadata: Arc::new(MetadataClient::new(config.metadata_api_base.clone())),
            transcripts: Arc::new(TranscriptClient::new(config.transcript_api_url.clone())),
            cache,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHANNEL_ROUTE, get(channel))
        .route(RECENT_VIDEO_ROUTE, get(recent_video))
        .route(STATS_ROUTE, get(stats))
        .route(TRANSCRIPT_ROUTE, get(transcript))
        .route(SEARCH_ROUTE, get(search))
        .route(PLAYLISTS_ROUTE, get(playlists))
        .route(RECOMMENDATIONS_ROUTE, get(recommendations))
        .route(COMMENTS_ROUTE, get(comments))
        .with_state(state)
}

/// A fully rendered response: the status plus the serialized JSON body.
/// This is the unit the cache stores and replays.
#[derive(Debug, Clone)]
struct Rendered {
    status: StatusCode,
    body: String,
}

impl Rendered {
    fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self { status, body },
            Err(err) => ApiError::unexpected(err.to_string()).into_rendered(),
        }
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        (self.status, headers, self.body).into_response()
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unexpected(detail: impl AsRef<str>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("An unexpected error occurred: {}", detail.as_ref()),
        }
    }

    /// Upstream answered with a non-2xx status: the same status goes back to
    /// the caller with a fixed message.
    fn upstream_failure(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: UPSTREAM_FAILURE_MESSAGE.to_string(),
        }
    }

    fn into_rendered(self) -> Rendered {
        Rendered {
            status: self.status,
            body: serde_json::json!({ "error": self.message }).to_string(),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status(code) => Self::upstream_failure(code),
            UpstreamError::Transport(msg) => Self::unexpected(msg),
            UpstreamError::Decode(msg) => Self::unexpected(msg),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Runs `compute` for one request, consulting the cache first when the route
/// is cacheable. The whole rendering is cached, error responses included, so
/// a cached 400 or 404 replays verbatim until it expires.
async fn serve(
    state: &AppState,
    route: &'static str,
    raw_query: Option<String>,
    compute: impl Future<Output = Rendered>,
) -> Response {
    if !CACHED_ROUTES.contains(&route) {
        return compute.await.into_response();
    }

    let key = CacheKey::new(route, raw_query.as_deref().unwrap_or(""));
    if let Some(cached) = state.cache.lookup(&key) {
        return Rendered {
            status: StatusCode::from_u16(cached.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: cached.body,
        }
        .into_response();
    }

    let rendered = compute.await;
    state.cache.store(
        key,
        CachedResponse {
            status: rendered.status.as_u16(),
            body: rendered.body.clone(),
        },
    );
    rendered.into_response()
}

fn render<T: Serialize>(result: ApiResult<T>) -> Rendered {
    match result {
        Ok(payload) => Rendered::json(StatusCode::OK, &payload),
        Err(err) => err.into_rendered(),
    }
}

/// Pulls a required query parameter. Absent and empty both fail validation;
/// anything else (whitespace included) is used as-is.
fn require_param(
    params: &HashMap<String, String>,
    name: &str,
    missing_message: &'static str,
) -> ApiResult<String> {
    match params.get(name) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ApiError::bad_request(missing_message)),
    }
}

/// Bridges a blocking upstream call into the async handler, mapping both the
/// join failure and the upstream's own error kinds.
async fn fetch_blocking<T, F>(call: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, UpstreamError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(call)
        .await
        .map_err(|err| ApiError::unexpected(format!("task join error: {err}")))?
        .map_err(ApiError::from)
}

#[derive(Debug, Serialize)]
struct ChannelInfo {
    title: Option<String>,
    description: Option<String>,
    subscribers: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecentVideo {
    video_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoStats {
    title: String,
    view_count: String,
}

#[derive(Debug, Serialize)]
struct Transcript {
    transcript: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    title: String,
    video_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSummary {
    title: String,
    playlist_id: String,
}

#[derive(Debug, Serialize)]
struct Comment {
    author: String,
    text: String,
}

async fn channel(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = channel_info(state.clone(), params);
    serve(&state, CHANNEL_ROUTE, raw_query, compute).await
}

async fn channel_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(channel_payload(state, params).await)
}

async fn channel_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<ChannelInfo> {
    let id = require_param(&params, "id", "No channel ID provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.channel(&id)).await?;

    let item = listing
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("No channel data found"))?;

    Ok(ChannelInfo {
        title: item.snippet.localized.title,
        description: item.snippet.localized.description,
        subscribers: item.statistics.subscriber_count,
    })
}

async fn recent_video(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = recent_video_info(state.clone(), params);
    serve(&state, RECENT_VIDEO_ROUTE, raw_query, compute).await
}

async fn recent_video_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(recent_video_payload(state, params).await)
}

async fn recent_video_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<RecentVideo> {
    let id = require_param(&params, "id", "No channel ID provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.recent_video(&id)).await?;

    let item = listing
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("No recent video found"))?;

    Ok(RecentVideo {
        video_url: format!("{WATCH_URL_PREFIX}{}", item.id.video_id),
    })
}

async fn stats(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = stats_info(state.clone(), params);
    serve(&state, STATS_ROUTE, raw_query, compute).await
}

async fn stats_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(stats_payload(state, params).await)
}

async fn stats_payload(state: AppState, params: HashMap<String, String>) -> ApiResult<VideoStats> {
    let id = require_param(&params, "id", "No video ID provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.video(&id)).await?;

    let item = listing
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("No video data found"))?;

    Ok(VideoStats {
        title: item.snippet.title,
        view_count: item.statistics.view_count,
    })
}

async fn transcript(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = transcript_info(state.clone(), params);
    serve(&state, TRANSCRIPT_ROUTE, raw_query, compute).await
}

async fn transcript_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(transcript_payload(state, params).await)
}

async fn transcript_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<Transcript> {
    let id = require_param(&params, "id", "No video ID provided")?;
    let client = state.transcripts.clone();
    let result = task::spawn_blocking(move || client.fetch(&id))
        .await
        .map_err(|err| ApiError::unexpected(format!("task join error: {err}")))?;

    // An unreachable or failing transcript service degrades to the sentinel
    // instead of an error status; only a 2xx body that fails to decode is
    // surfaced as a real failure.
    let transcript = match result {
        Ok(envelope) => envelope
            .transcript
            .unwrap_or_else(|| NO_TRANSCRIPT.to_string()),
        Err(UpstreamError::Status(_)) | Err(UpstreamError::Transport(_)) => {
            NO_TRANSCRIPT.to_string()
        }
        Err(err @ UpstreamError::Decode(_)) => return Err(ApiError::from(err)),
    };

    Ok(Transcript { transcript })
}

async fn search(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = search_info(state.clone(), params);
    serve(&state, SEARCH_ROUTE, raw_query, compute).await
}

async fn search_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(search_payload(state, params).await)
}

async fn search_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<Vec<SearchHit>> {
    let query = require_param(&params, "query", "No search query provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.search(&query)).await?;

    Ok(listing
        .items
        .into_iter()
        .map(|item| SearchHit {
            title: item.snippet.title,
            video_id: item.id.video_id,
        })
        .collect())
}

async fn playlists(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = playlists_info(state.clone(), params);
    serve(&state, PLAYLISTS_ROUTE, raw_query, compute).await
}

async fn playlists_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(playlists_payload(state, params).await)
}

async fn playlists_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<Vec<PlaylistSummary>> {
    let id = require_param(&params, "id", "No channel ID provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.playlists(&id)).await?;

    if listing.items.is_empty() {
        return Err(ApiError::not_found("No playlists found"));
    }

    Ok(listing
        .items
        .into_iter()
        .map(|item| PlaylistSummary {
            title: item.snippet.title,
            playlist_id: item.id,
        })
        .collect())
}

async fn recommendations(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = recommendations_info(state.clone(), params);
    serve(&state, RECOMMENDATIONS_ROUTE, raw_query, compute).await
}

async fn recommendations_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(recommendations_payload(state, params).await)
}

async fn recommendations_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<Vec<SearchHit>> {
    let id = require_param(&params, "id", "No video ID provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.related_videos(&id)).await?;

    Ok(listing
        .items
        .into_iter()
        .map(|item| SearchHit {
            title: item.snippet.title,
            video_id: item.id.video_id,
        })
        .collect())
}

async fn comments(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let compute = comments_info(state.clone(), params);
    serve(&state, COMMENTS_ROUTE, raw_query, compute).await
}

async fn comments_info(state: AppState, params: HashMap<String, String>) -> Rendered {
    render(comments_payload(state, params).await)
}

async fn comments_payload(
    state: AppState,
    params: HashMap<String, String>,
) -> ApiResult<Vec<Comment>> {
    let id = require_param(&params, "id", "No video ID provided")?;
    let client = state.metadata.clone();
    let listing = fetch_blocking(move || client.comment_threads(&id)).await?;

    Ok(listing
        .items
        .into_iter()
        .map(|thread| {
            let comment = thread.snippet.top_level_comment.snippet;
            Comment {
                author: comment.author_display_name,
                text: comment.text_display,
            }
        })
        .collect())
}
