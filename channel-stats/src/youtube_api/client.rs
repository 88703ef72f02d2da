//! Core YouTube API client functionality and API key rotation.

use crate::youtube_api::{
    channels::{Channel, ChannelListResponse},
    comments::{CommentThread, CommentThreadListResponse},
    credentials::CredentialPool,
    error::{self, ApiError},
    search::{SearchListResponse, SearchResult},
    types::PagedStream,
    videos::{Video, VideoListResponse},
};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::instrument;

/// Where the YouTube Data API v3 lives.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page YouTube serves for `search.list`.
pub const SEARCH_PAGE_SIZE: u32 = 50;

/// Largest number of ids YouTube accepts in a single `videos.list` call.
pub const VIDEO_BATCH_SIZE: usize = 50;

/// Largest page YouTube serves for `commentThreads.list`.
pub const COMMENT_THREAD_PAGE_SIZE: u32 = 100;

/// Client for interacting with the YouTube Data API v3 using plain API keys.
///
/// Every call is made with whichever key the shared [`CredentialPool`] currently points at.
/// When YouTube answers that the key is out of quota, the client rotates to the next key and
/// retries, trying each key at most once per call. Any other failure is returned straight
/// away.
///
/// Cloning is cheap; clones share the credential pool and the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    /// Keys shared by every request this process serves
    credentials: Arc<CredentialPool>,
    /// HTTP client for API requests
    client: reqwest::Client,
    /// API root, without a trailing slash
    base_url: String,
    /// Page cap applied to every paginated listing
    max_pages: Option<usize>,
}

impl YouTubeClient {
    /// Creates a new YouTube API client using the given keys and HTTP client.
    ///
    /// # Arguments
    ///
    /// * `credentials` - Shared pool of API keys
    /// * `client` - Shared HTTP client for making API requests
    pub fn new(credentials: Arc<CredentialPool>, client: reqwest::Client) -> Self {
        Self {
            credentials,
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: None,
        }
    }

    /// Points the client at a different API root, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Caps how many pages any single paginated listing may fetch. `None` means no cap.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// The shared key pool.
    pub fn credentials(&self) -> &Arc<CredentialPool> {
        &self.credentials
    }

    /// Makes a keyed GET request to the YouTube API, rotating keys on quota errors.
    ///
    /// The current key is attached as the `key` query parameter. If YouTube reports that the
    /// key is out of quota, the pool is rotated and the call is retried with the next key.
    /// Once every key has been tried, the call fails with
    /// [`ApiError::CredentialsExhausted`] without making further requests. Any other
    /// non-success status is returned immediately as [`ApiError::Status`].
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The resource path below the API root, e.g. `search`
    /// * `query_params` - Query parameters other than the key
    ///
    /// # Returns
    ///
    /// The raw [`reqwest::Response`] for method-specific JSON parsing.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    pub(crate) async fn make_keyed_request(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let attempts = self.credentials.len();

        for attempt in 0..attempts {
            let credential = self.credentials.current();

            let response = self
                .client
                .get(&url)
                .query(query_params)
                .query(&[("key", credential.key)])
                .send()
                .await
                .map_err(|source| ApiError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let reason = error::error_reason(&body);

            if !error::is_quota_failure(status, reason.as_deref()) {
                return Err(ApiError::Status {
                    endpoint: endpoint.to_string(),
                    status,
                    reason,
                    body,
                });
            }

            let quota = ApiError::QuotaExceeded { status, body };
            tracing::warn!(
                endpoint,
                key_index = credential.index,
                attempt = attempt + 1,
                of = attempts,
                error = %quota,
                "API key limit reached, rotating API key"
            );
            self.credentials.rotate_from(credential.index);
        }

        tracing::error!(endpoint, attempts, "all API keys have reached their limits");
        Err(ApiError::CredentialsExhausted { attempts })
    }

    /// Gets the statistics of a single channel.
    ///
    /// Uses the `channels.list` API with `part=statistics`.
    ///
    /// # Returns
    ///
    /// The [`Channel`], or `None` if YouTube knows no channel with that ID.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, ApiError> {
        let endpoint = "channels";
        let query_params = [("part", "statistics"), ("id", channel_id)];

        let response = self.make_keyed_request(endpoint, &query_params).await?;

        let channels: ChannelListResponse =
            response.json().await.map_err(|source| ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;

        tracing::debug!(
            channel_id,
            returned_items = channels.items.len(),
            "fetched channel statistics"
        );

        Ok(channels.items.into_iter().next())
    }

    /// Returns a paginated stream of all search results for a channel, newest first.
    ///
    /// Uses the `search.list` API restricted to `channelId`, ordered by date, 50 results per
    /// page. Results may include playlists as well as videos; see
    /// [`SearchResult::video_id`].
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/search/list>
    #[instrument(skip(self))]
    pub fn search_channel_videos(
        &self,
        channel_id: &str,
    ) -> impl Stream<Item = Result<SearchResult, ApiError>> + use<'_> {
        let channel_id = channel_id.to_string();
        PagedStream::new(move |page_token| {
            let channel_id = channel_id.clone();
            async move {
                let response = self
                    .search_channel_internal(&channel_id, SEARCH_PAGE_SIZE, page_token)
                    .await?;
                Ok((response.items, response.next_page_token))
            }
        })
        .with_max_pages(self.max_pages)
    }

    /// Returns a stream of the videos named in a batch of comma-separated IDs.
    ///
    /// Uses the `videos.list` API with `part=snippet,statistics`. The batch must hold at most
    /// [`VIDEO_BATCH_SIZE`] IDs. YouTube does not normally paginate id lookups, but a
    /// continuation token is followed if one comes back.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub fn list_videos(
        &self,
        video_ids: &str,
    ) -> impl Stream<Item = Result<Video, ApiError>> + use<'_> {
        let video_ids = video_ids.to_string();
        PagedStream::new(move |page_token| {
            let video_ids = video_ids.clone();
            async move {
                let response = self.list_videos_internal(&video_ids, page_token).await?;
                Ok((response.items, response.next_page_token))
            }
        })
        .with_max_pages(self.max_pages)
    }

    /// Returns a paginated stream of all top-level comment threads on a video.
    ///
    /// Uses the `commentThreads.list` API with `part=snippet`, 100 threads per page.
    ///
    /// Videos with comments turned off fail with a 403 whose reason is `commentsDisabled`;
    /// that is not treated as a quota error.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/commentThreads/list>
    #[instrument(skip(self))]
    pub fn list_comment_threads(
        &self,
        video_id: &str,
    ) -> impl Stream<Item = Result<CommentThread, ApiError>> + use<'_> {
        let video_id = video_id.to_string();
        PagedStream::new(move |page_token| {
            let video_id = video_id.clone();
            async move {
                let response = self
                    .list_comment_threads_internal(&video_id, COMMENT_THREAD_PAGE_SIZE, page_token)
                    .await?;
                Ok((response.items, response.next_page_token))
            }
        })
        .with_max_pages(self.max_pages)
    }

    /// Internal method to call the `search.list` API for one page of a channel's videos.
    ///
    /// # Arguments
    ///
    /// * `channel_id` - Channel whose uploads to list
    /// * `max_results` - Maximum number of results per page (1-50)
    /// * `page_token` - Token for retrieving a specific page of results
    async fn search_channel_internal(
        &self,
        channel_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<SearchListResponse, ApiError> {
        let endpoint = "search";
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet,id"),
            ("channelId", channel_id),
            ("order", "date"),
            ("maxResults", max_results_string.as_str()),
        ];

        // Add pageToken if provided
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self.make_keyed_request(endpoint, &query_params).await?;

        let results: SearchListResponse =
            response.json().await.map_err(|source| ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;

        tracing::debug!(
            channel_id,
            total_results = results.page_info.total_results,
            returned_items = results.items.len(),
            "fetched channel search page"
        );

        Ok(results)
    }

    /// Internal method to call the `videos.list` API for a batch of IDs.
    async fn list_videos_internal(
        &self,
        video_ids: &str,
        page_token: Option<String>,
    ) -> Result<VideoListResponse, ApiError> {
        let endpoint = "videos";
        let mut query_params = vec![("part", "snippet,statistics"), ("id", video_ids)];

        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self.make_keyed_request(endpoint, &query_params).await?;

        let videos: VideoListResponse =
            response.json().await.map_err(|source| ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;

        tracing::debug!(
            returned_items = videos.items.len(),
            "fetched video details batch"
        );

        Ok(videos)
    }

    /// Internal method to call the `commentThreads.list` API for one page of a video's comments.
    ///
    /// # Arguments
    ///
    /// * `video_id` - Video whose comments to list
    /// * `max_results` - Maximum number of threads per page (1-100)
    /// * `page_token` - Token for retrieving a specific page of results
    async fn list_comment_threads_internal(
        &self,
        video_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<CommentThreadListResponse, ApiError> {
        let endpoint = "commentThreads";
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results_string.as_str()),
        ];

        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self.make_keyed_request(endpoint, &query_params).await?;

        let threads: CommentThreadListResponse =
            response.json().await.map_err(|source| ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;

        tracing::trace!(
            video_id,
            returned_items = threads.items.len(),
            "fetched comment thread page"
        );

        Ok(threads)
    }
}
