//! Channel-wide totals computed from a [`ChannelSnapshot`].

use crate::snapshot::{ChannelSnapshot, VideoRecord};
use serde::{Deserialize, Serialize};

/// The `data` payload of a successful `/getInformation` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReport {
    pub total_views: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub subscribers: u64,
    pub videos: Vec<VideoRecord>,
}

impl From<ChannelSnapshot> for ChannelReport {
    fn from(snapshot: ChannelSnapshot) -> Self {
        let (total_views, total_likes, total_comments) =
            snapshot
                .videos
                .iter()
                .fold((0u64, 0u64, 0u64), |(views, likes, comments), video| {
                    (
                        views.saturating_add(video.view_count),
                        likes.saturating_add(video.like_count),
                        comments.saturating_add(video.comment_count),
                    )
                });

        Self {
            total_views,
            total_likes,
            total_comments,
            subscribers: snapshot.subscriber_count,
            videos: snapshot.videos,
        }
    }
}
