//! YouTube Comment Threads API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `commentThreads.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentThreadListResponse {
    /// The value will be `youtube#commentThreadListResponse`.
    pub kind: String,
    /// A list of comment threads that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<CommentThread>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `commentThread` is a top-level comment and, optionally, replies to it.
///
/// Replies are not requested, so only the top-level comment is available.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentThread {
    pub id: String,
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentThreadSnippet {
    /// The ID of the video the comments refer to.
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
    #[serde(rename = "topLevelComment")]
    pub top_level_comment: TopLevelComment,
    /// The total number of replies (not including the top-level comment).
    #[serde(rename = "totalReplyCount", default)]
    pub total_reply_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopLevelComment {
    pub id: String,
    pub snippet: CommentSnippet,
}

/// Details of a single comment.
///
/// See: <https://developers.google.com/youtube/v3/docs/comments#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentSnippet {
    /// The original, raw text of the comment as it was initially posted.
    ///
    /// Only guaranteed to be returned to the comment's author.
    #[serde(rename = "textOriginal", default)]
    pub text_original: Option<String>,
    /// The comment's text as rendered by YouTube, possibly containing HTML.
    #[serde(rename = "textDisplay", default)]
    pub text_display: Option<String>,
    /// The display name of the user who posted the comment.
    #[serde(rename = "authorDisplayName", default)]
    pub author_display_name: Option<String>,
    /// The date and time when the comment was originally published.
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
    #[serde(rename = "likeCount", default)]
    pub like_count: u64,
}

impl CommentSnippet {
    /// The raw text if YouTube returned it, otherwise the display text.
    pub fn text(&self) -> Option<&str> {
        self.text_original
            .as_deref()
            .or(self.text_display.as_deref())
    }
}
