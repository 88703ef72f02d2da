//! Shared types and streaming infrastructure for the YouTube API client.

use crate::youtube_api::error::ApiError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

type OneFuturePage<'a, F, T> =
    Pin<Box<dyn Future<Output = Result<(F, (VecDeque<T>, Option<String>)), ApiError>> + 'a + Send>>;

/// A paginated stream that automatically fetches subsequent pages from a YouTube API list endpoint.
///
/// This stream yields items one by one, automatically fetching the next page when the current
/// page is exhausted. Only supports forward pagination (no previous page support).
///
/// A page counts as the last one when its continuation token is absent or empty. With a page
/// cap set through [`Self::with_max_pages`], the stream yields every item of the pages it did
/// fetch and then a single [`ApiError::PageLimitExceeded`].
///
/// If the stream ends in an error, [`Self::resume_token`] tells which page it was on, and
/// [`Self::resume`] picks up from there.
pub struct PagedStream<'a, T, F> {
    /// Current batch of items from the most recent API response
    current_items: VecDeque<T>,
    /// Future representing the currently pending API request, if any
    pending_request: Option<OneFuturePage<'a, F, T>>,
    /// Token of the page that is pending (or that was not fetched because of the cap)
    pending_token: Option<String>,
    /// Number of pages received so far
    pages_fetched: usize,
    /// Stop with an error after this many pages
    max_pages: Option<usize>,
    /// Error to report once the items already received have been drained
    trailing_error: Option<ApiError>,
    /// Whether we've reached the end of all available data
    is_done: bool,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Create a new PagedStream starting at the first page of results.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<(VecDeque<T>, Option<String>), ApiError>> + Send + 'a,
    {
        Self::resume(fetcher, None)
    }

    /// Create a PagedStream that starts at the page identified by `page_token`.
    ///
    /// Passing `None` starts from the beginning, same as [`Self::new`].
    pub fn resume<Fut>(fetcher: F, page_token: Option<String>) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = Result<(VecDeque<T>, Option<String>), ApiError>> + Send + 'a,
    {
        let first_token = page_token.clone();
        let first_page = async move {
            let results = fetcher(first_token).await?;
            Ok((fetcher, results))
        };
        Self {
            pending_request: Some(Box::pin(first_page)),
            pending_token: page_token,
            current_items: VecDeque::new(),
            pages_fetched: 0,
            max_pages: None,
            trailing_error: None,
            is_done: false,
        }
    }

    /// Cap the number of pages this stream will fetch. `None` means no cap.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Number of pages received so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Continuation token of the page that is pending, failed, or was cut off by the page cap.
    ///
    /// `None` means the first page.
    pub fn resume_token(&self) -> Option<&str> {
        self.pending_token.as_deref()
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = Result<(VecDeque<T>, Option<String>), ApiError>> + Send + 'a,
{
    type Item = Result<T, ApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // If we have items in the current batch, return the next one
            if let Some(item) = self.current_items.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            // If we're done (no more pages), report a deferred error once, then end
            if self.is_done {
                return Poll::Ready(self.trailing_error.take().map(Err));
            }

            // If we have a pending request, poll it
            if let Some(pending) = self.pending_request.as_mut() {
                match pending.as_mut().poll(cx) {
                    Poll::Ready(Ok((fetcher, (items, next_token)))) => {
                        self.pages_fetched += 1;
                        self.current_items.extend(items);
                        self.pending_request = None;

                        match next_token.filter(|token| !token.is_empty()) {
                            Some(next_token) => {
                                self.pending_token = Some(next_token.clone());
                                if let Some(max_pages) = self.max_pages
                                    && self.pages_fetched >= max_pages
                                {
                                    tracing::warn!(
                                        max_pages,
                                        "page cap reached with more results remaining"
                                    );
                                    self.trailing_error =
                                        Some(ApiError::PageLimitExceeded { max_pages });
                                    self.is_done = true;
                                } else {
                                    // Set up the future for the next page
                                    // (but don't poll it yet)
                                    self.pending_request = Some(Box::pin(async move {
                                        let results = fetcher(Some(next_token)).await?;
                                        Ok((fetcher, results))
                                    }));
                                }
                            }
                            None => {
                                // If no next token, we're done
                                self.pending_token = None;
                                self.is_done = true;
                            }
                        }

                        // Continue the loop to try yielding an item
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        // Error fetching the page; pending_token still names it
                        self.pending_request = None;
                        self.is_done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => {
                        // Still waiting for the response
                        return Poll::Pending;
                    }
                }
            } else {
                // No pending request and no next page token means we're done
                self.is_done = true;
                return Poll::Ready(None);
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// Includes the total number of items available and the number of resources
/// returned in a single page response.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults", default)]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage", default)]
    pub results_per_page: u32,
}
