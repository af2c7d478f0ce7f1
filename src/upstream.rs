//! Blocking HTTP clients for the two upstream services.
//!
//! The metadata service is a REST API returning `{"items": [...]}` listings;
//! the transcript service takes a POST with a JSON body. Both clients return
//! typed payload views and classify failures into [`UpstreamError`] so the
//! gateway can map them onto its response contract instead of catching
//! everything in one bucket.
//!
//! Parameter values are interpolated into upstream URLs verbatim. Callers
//! must pass valid URL characters; the gateway deliberately adds no encoding
//! of its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ureq::Agent;

/// How a single upstream call failed.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The call completed but the service answered with a non-2xx status.
    #[error("upstream returned status {0}")]
    Status(u16),
    /// The call never completed (connection refused, DNS, timeout).
    #[error("{0}")]
    Transport(String),
    /// The call succeeded but the body was not the JSON shape we expect.
    #[error("{0}")]
    Decode(String),
}

impl From<ureq::Error> for UpstreamError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => UpstreamError::Status(code),
            other => UpstreamError::Transport(other.to_string()),
        }
    }
}

/// Listing wrapper shared by every metadata endpoint. An absent `items`
/// field decodes the same as an empty one.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Listing<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

/// `channels` item. Every field the gateway extracts here is optional and
/// serializes as null when the service omits it.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelItem {
    #[serde(default)]
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: ChannelStatistics,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelSnippet {
    #[serde(default)]
    pub localized: LocalizedText,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocalizedText {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelStatistics {
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: Option<String>,
}

/// `search` item, also returned by the related-videos lookup: the id is an
/// object wrapping the video id. These fields are required; a listing entry
/// without them is a decode error, not an empty result.
#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
    pub snippet: TitledSnippet,
}

#[derive(Debug, Deserialize)]
pub struct SearchItemId {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TitledSnippet {
    pub title: String,
}

/// `videos` item as used by the stats lookup.
#[derive(Debug, Deserialize)]
pub struct VideoItem {
    pub snippet: TitledSnippet,
    pub statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount")]
    pub view_count: String,
}

/// `playlists` item: here the id is a plain string.
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub snippet: TitledSnippet,
}

/// `commentThreads` item with its doubly nested top-level comment.
#[derive(Debug, Deserialize)]
pub struct CommentThread {
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
pub struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    pub top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
pub struct TopLevelComment {
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
pub struct CommentSnippet {
    #[serde(rename = "authorDisplayName")]
    pub author_display_name: String,
    #[serde(rename = "textDisplay")]
    pub text_display: String,
}

/// Client for the metadata REST API. All methods block; the gateway calls
/// them through `spawn_blocking`.
pub struct MetadataClient {
    agent: Agent,
    base_url: String,
}

impl MetadataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: Agent::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn get_listing<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Listing<T>, UpstreamError> {
        let response = self.agent.get(url).call()?;
        response
            .into_json()
            .map_err(|err| UpstreamError::Decode(err.to_string()))
    }

    pub fn channel(&self, channel_id: &str) -> Result<Listing<ChannelItem>, UpstreamError> {
        self.get_listing(&channel_url(&self.base_url, channel_id))
    }

    pub fn recent_video(&self, channel_id: &str) -> Result<Listing<SearchItem>, UpstreamError> {
        self.get_listing(&recent_video_url(&self.base_url, channel_id))
    }

    pub fn video(&self, video_id: &str) -> Result<Listing<VideoItem>, UpstreamError> {
        self.get_listing(&video_url(&self.base_url, video_id))
    }

    pub fn search(&self, query: &str) -> Result<Listing<SearchItem>, UpstreamError> {
        self.get_listing(&search_url(&self.base_url, query))
    }

    pub fn playlists(&self, channel_id: &str) -> Result<Listing<PlaylistItem>, UpstreamError> {
        self.get_listing(&playlists_url(&self.base_url, channel_id))
    }

    pub fn related_videos(&self, video_id: &str) -> Result<Listing<SearchItem>, UpstreamError> {
        self.get_listing(&related_videos_url(&self.base_url, video_id))
    }

    pub fn comment_threads(&self, video_id: &str) -> Result<Listing<CommentThread>, UpstreamError> {
        self.get_listing(&comment_threads_url(&self.base_url, video_id))
    }
}

fn channel_url(base: &str, channel_id: &str) -> String {
    format!("{base}/channels?part=snippet,statistics&id={channel_id}")
}

fn recent_video_url(base: &str, channel_id: &str) -> String {
    format!("{base}/search?part=snippet&channelId={channel_id}&maxResults=1&order=date&type=video")
}

fn video_url(base: &str, video_id: &str) -> String {
    format!("{base}/videos?id={video_id}&part=snippet,contentDetails,statistics,status")
}

fn search_url(base: &str, query: &str) -> String {
    format!("{base}/search?part=snippet&q={query}&maxResults=5&type=video")
}

fn playlists_url(base: &str, channel_id: &str) -> String {
    format!("{base}/playlists?part=snippet&channelId={channel_id}&maxResults=5")
}

fn related_videos_url(base: &str, video_id: &str) -> String {
    format!("{base}/videos?id={video_id}&part=related")
}

fn comment_threads_url(base: &str, video_id: &str) -> String {
    format!("{base}/commentThreads?part=snippet&videoId={video_id}&maxResults=5")
}

/// Body posted to the transcript service.
#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    video_id: &'a str,
    format: bool,
}

/// Response from the transcript service. The `transcript` field is optional;
/// the gateway substitutes its sentinel when it is absent.
#[derive(Debug, Deserialize)]
pub struct TranscriptEnvelope {
    pub transcript: Option<String>,
}

/// Client for the transcript POST endpoint.
pub struct TranscriptClient {
    agent: Agent,
    url: String,
}

impl TranscriptClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            agent: Agent::new(),
            url: url.into(),
        }
    }

    pub fn fetch(&self, video_id: &str) -> Result<TranscriptEnvelope, UpstreamError> {
        let response = self.agent.post(&self.url).send_json(TranscriptRequest {
            video_id,
            format: true,
        })?;
        response
            .into_json()
            .map_err(|err| UpstreamError::Decode(err.to_string()))
    }
}
