//! Channel statistics over the YouTube Data API.
//!
//! [`snapshot::fetch_channel_snapshot`] collects a channel's subscriber count and every
//! video with its top-level comments, [`report::ChannelReport`] adds up the totals, and
//! [`server`] exposes both as `POST /getInformation`.

pub mod config;
pub mod report;
pub mod server;
pub mod snapshot;
pub mod youtube_api;
