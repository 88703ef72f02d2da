//! YouTube Data API v3 client library.
//!
//! This module provides a key-based client for the read-only parts of the YouTube Data API
//! v3 that channel statistics need: channel statistics, a channel's videos, video details,
//! and comment threads.
//!
//! # Keys and quota
//!
//! Every API key has its own daily quota. The client draws keys from a shared
//! [`CredentialPool`] and, when YouTube reports that the current key is exhausted, moves on
//! to the next one. A single call tries each key at most once before giving up with
//! [`ApiError::CredentialsExhausted`]. Errors that have nothing to do with quota are never
//! retried.
//!
//! # Pagination
//!
//! List endpoints are exposed as [`PagedStream`]s that fetch the next page only once the
//! previous one has been consumed, and that can be capped at a maximum number of pages.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use channel_stats::youtube_api::{CredentialPool, YouTubeClient};
//! use std::sync::Arc;
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> eyre::Result<()> {
//! let keys = Arc::new(CredentialPool::new(["key-one", "key-two"])?);
//! let client = YouTubeClient::new(keys, reqwest::Client::new());
//!
//! let mut videos = std::pin::pin!(client.search_channel_videos("UC_x5XG1OV2P6uZZ5FSM9Ttw"));
//! while let Some(result) = videos.next().await {
//!     if let Some(video_id) = result?.video_id() {
//!         println!("video: {video_id}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod client;
pub mod comments;
pub mod credentials;
pub mod error;
pub mod search;
pub mod types;
pub mod videos;

#[cfg(test)]
pub(crate) mod mock;

// Re-export main types for convenience
pub use client::{
    COMMENT_THREAD_PAGE_SIZE, DEFAULT_BASE_URL, SEARCH_PAGE_SIZE, VIDEO_BATCH_SIZE, YouTubeClient,
};
pub use credentials::{Credential, CredentialPool, EmptyPool};
pub use error::ApiError;
pub use types::{PageInfo, PagedStream};

// Re-export commonly used types from each module
pub use channels::{Channel, ChannelStatistics};
pub use comments::{CommentSnippet, CommentThread};
pub use search::SearchResult;
pub use videos::{Video, VideoStatistics};
