//! Assembly of a complete [`ChannelSnapshot`] from the YouTube API.
//!
//! A snapshot is built in four sequential stages: the channel's subscriber count, every
//! video id the channel has, the details of those videos in batches, and finally every
//! top-level comment on each video. Each stage depends on the one before it, so nothing is
//! fetched concurrently within one snapshot.

use crate::youtube_api::{ApiError, VIDEO_BATCH_SIZE, Video, YouTubeClient};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::instrument;

/// A top-level comment on a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "comment")]
    pub text: String,
    pub author: String,
    #[serde(rename = "date")]
    pub published_at: Timestamp,
}

/// Title, counters, and comments of one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub title: String,
    #[serde(rename = "views")]
    pub view_count: u64,
    #[serde(rename = "likes")]
    pub like_count: u64,
    #[serde(rename = "comments")]
    pub comment_count: u64,
    #[serde(rename = "link")]
    pub canonical_url: String,
    #[serde(rename = "commentsArray")]
    pub comments: Vec<Comment>,
}

impl VideoRecord {
    /// Builds the record for `video`, with `comments` already fetched.
    ///
    /// Counters YouTube does not report (e.g. hidden like counts) are taken as zero.
    pub fn new(video: Video, comments: Vec<Comment>) -> Self {
        let canonical_url = video.watch_url();
        let stats = &video.statistics;
        Self {
            view_count: parse_count(stats.view_count.as_deref()),
            like_count: parse_count(stats.like_count.as_deref()),
            comment_count: parse_count(stats.comment_count.as_deref()),
            title: video.snippet.title,
            canonical_url,
            comments,
        }
    }
}

/// Everything fetched for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub subscriber_count: u64,
    pub videos: Vec<VideoRecord>,
}

impl ChannelSnapshot {
    /// A snapshot with no subscribers and no videos.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The stage of the snapshot pipeline that failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("fetch channel statistics")]
    ChannelStatistics(#[source] ApiError),

    #[error("list channel videos")]
    VideoSearch(#[source] ApiError),

    #[error("fetch video details")]
    VideoDetails(#[source] ApiError),

    #[error("fetch comment threads for video {video_id}")]
    CommentThreads {
        video_id: String,
        #[source]
        source: ApiError,
    },

    #[error("channel fetch did not finish within {0:?}")]
    TimedOut(Duration),
}

impl PipelineError {
    /// The API error underneath this failure, if there is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            PipelineError::ChannelStatistics(e)
            | PipelineError::VideoSearch(e)
            | PipelineError::VideoDetails(e)
            | PipelineError::CommentThreads { source: e, .. } => Some(e),
            PipelineError::ChannelNotFound(_) | PipelineError::TimedOut(_) => None,
        }
    }
}

/// Splits video ids into comma-joined batches of at most [`VIDEO_BATCH_SIZE`], keeping order.
pub fn video_id_batches<S: AsRef<str>>(video_ids: &[S]) -> impl Iterator<Item = String> + '_ {
    video_ids.chunks(VIDEO_BATCH_SIZE).map(|batch| {
        batch
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(",")
    })
}

fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Fetches the complete snapshot for one channel.
///
/// Any failure aborts the whole snapshot; no partial result is returned. The one exception
/// is a video with comments turned off, which simply gets an empty comment list.
#[instrument(skip(client))]
pub async fn fetch_channel_snapshot(
    client: &YouTubeClient,
    channel_id: &str,
) -> Result<ChannelSnapshot, PipelineError> {
    let channel = client
        .get_channel(channel_id)
        .await
        .map_err(PipelineError::ChannelStatistics)?
        .ok_or_else(|| PipelineError::ChannelNotFound(channel_id.to_string()))?;
    let subscriber_count = parse_count(channel.statistics.subscriber_count.as_deref());

    let mut video_ids = Vec::new();
    let mut search = std::pin::pin!(client.search_channel_videos(channel_id));
    while let Some(result) = search.next().await {
        let result = result.map_err(PipelineError::VideoSearch)?;
        match result.video_id() {
            Some(video_id) => video_ids.push(video_id.to_string()),
            None => tracing::trace!(kind = result.id.kind, "skipping non-video search result"),
        }
    }
    tracing::debug!(videos = video_ids.len(), "collected channel video ids");

    let mut videos = Vec::with_capacity(video_ids.len());
    for batch in video_id_batches(&video_ids) {
        let mut details = std::pin::pin!(client.list_videos(&batch));
        while let Some(video) = details.next().await {
            let video = video.map_err(PipelineError::VideoDetails)?;
            let comments = fetch_comments(client, &video.id).await?;
            videos.push(VideoRecord::new(video, comments));
        }
    }

    tracing::info!(
        subscribers = subscriber_count,
        videos = videos.len(),
        "assembled channel snapshot"
    );

    Ok(ChannelSnapshot {
        subscriber_count,
        videos,
    })
}

/// Like [`fetch_channel_snapshot`], but gives up with [`PipelineError::TimedOut`] after
/// `timeout` if one is set.
pub async fn fetch_channel_snapshot_within(
    client: &YouTubeClient,
    channel_id: &str,
    timeout: Option<Duration>,
) -> Result<ChannelSnapshot, PipelineError> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, fetch_channel_snapshot(client, channel_id))
            .await
            .map_err(|_| PipelineError::TimedOut(timeout))?,
        None => fetch_channel_snapshot(client, channel_id).await,
    }
}

async fn fetch_comments(client: &YouTubeClient, video_id: &str) -> Result<Vec<Comment>, PipelineError> {
    let mut comments = Vec::new();
    let mut threads = std::pin::pin!(client.list_comment_threads(video_id));
    while let Some(thread) = threads.next().await {
        match thread {
            Ok(thread) => {
                let snippet = thread.snippet.top_level_comment.snippet;
                let text = snippet.text().unwrap_or_default().to_string();
                comments.push(Comment {
                    text,
                    author: snippet.author_display_name.unwrap_or_default(),
                    published_at: snippet.published_at,
                });
            }
            Err(e) if e.reason() == Some("commentsDisabled") => {
                // keep whatever earlier pages returned
                tracing::debug!(video_id, kept = comments.len(), "comments are disabled");
                return Ok(comments);
            }
            Err(source) => {
                return Err(PipelineError::CommentThreads {
                    video_id: video_id.to_string(),
                    source,
                });
            }
        }
    }
    Ok(comments)
}
