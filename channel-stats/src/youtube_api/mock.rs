//! Scripted stand-in for the YouTube Data API, for tests.
//!
//! The mock binds to a random local port and answers every request by calling a responder
//! closure with the parsed request. Every request is recorded so tests can check which keys,
//! page tokens, and ids were sent.

use crate::youtube_api::{CredentialPool, YouTubeClient};
use http_body_util::Full;
use hyper::body::{self, Bytes};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request received by the mock.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    /// Path below the API root, e.g. `commentThreads`
    pub endpoint: String,
    pub params: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

type Responder = dyn Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync;

pub(crate) struct MockYouTube {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
}

impl MockYouTube {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock YouTube server");
        let addr = listener.local_addr().expect("get mock server address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let recorded = requests.clone();
        let server = tokio::spawn(async move {
            loop {
                let Ok((conn, _)) = listener.accept().await else {
                    return;
                };
                let conn = hyper_util::rt::TokioIo::new(conn);
                let responder = responder.clone();
                let recorded = recorded.clone();
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let responder = responder.clone();
                    let recorded = recorded.clone();
                    async move {
                        let request = RecordedRequest {
                            endpoint: req.uri().path().trim_start_matches('/').to_string(),
                            params: form_urlencoded::parse(
                                req.uri().query().unwrap_or("").as_bytes(),
                            )
                            .into_owned()
                            .collect(),
                        };
                        let (status, body) = responder(&request);
                        recorded.lock().unwrap().push(request);

                        let mut response = Response::new(Full::<Bytes>::from(body.to_string()));
                        *response.status_mut() = status;
                        response
                            .headers_mut()
                            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                        Ok::<_, Infallible>(response)
                    }
                });
                tokio::spawn(async move {
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(conn, service)
                        .await;
                });
            }
        });

        Self {
            addr,
            requests,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// A client pointed at this mock with a fresh pool of the given keys.
    pub fn client(&self, keys: &[&str]) -> YouTubeClient {
        let credentials = Arc::new(CredentialPool::new(keys.iter().copied()).unwrap());
        YouTubeClient::new(credentials, reqwest::Client::new()).with_base_url(self.base_url())
    }
}

impl Drop for MockYouTube {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub(crate) fn api_error(code: u16, reason: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": format!("request failed: {reason}"),
            "errors": [{ "message": "request failed", "domain": "youtube", "reason": reason }]
        }
    })
}

pub(crate) fn quota_error() -> Value {
    api_error(403, "quotaExceeded")
}

pub(crate) fn channel_page(channel_id: &str, subscribers: u64) -> Value {
    json!({
        "kind": "youtube#channelListResponse",
        "pageInfo": { "totalResults": 1, "resultsPerPage": 5 },
        "items": [{
            "kind": "youtube#channel",
            "id": channel_id,
            "statistics": {
                "viewCount": "1000",
                "subscriberCount": subscribers.to_string(),
                "hiddenSubscriberCount": false,
                "videoCount": "2"
            }
        }]
    })
}

pub(crate) fn search_page(video_ids: &[&str], next_page_token: Option<&str>) -> Value {
    let items: Vec<Value> = video_ids
        .iter()
        .map(|id| {
            json!({
                "kind": "youtube#searchResult",
                "id": { "kind": "youtube#video", "videoId": id },
                "snippet": { "title": format!("video {id}") }
            })
        })
        .collect();
    let mut page = json!({
        "kind": "youtube#searchListResponse",
        "pageInfo": { "totalResults": items.len(), "resultsPerPage": 50 },
        "items": items,
    });
    if let Some(token) = next_page_token {
        page["nextPageToken"] = json!(token);
    }
    page
}

/// `(id, title, views, likes, comments)`
pub(crate) type VideoFixture<'a> = (&'a str, &'a str, u64, u64, u64);

pub(crate) fn video_page(videos: &[VideoFixture<'_>]) -> Value {
    let items: Vec<Value> = videos
        .iter()
        .map(|(id, title, views, likes, comments)| {
            json!({
                "kind": "youtube#video",
                "id": id,
                "snippet": {
                    "title": title,
                    "publishedAt": "2024-03-01T12:00:00Z",
                    "channelId": "UC1"
                },
                "statistics": {
                    "viewCount": views.to_string(),
                    "likeCount": likes.to_string(),
                    "favoriteCount": "0",
                    "commentCount": comments.to_string()
                }
            })
        })
        .collect();
    json!({
        "kind": "youtube#videoListResponse",
        "pageInfo": { "totalResults": items.len(), "resultsPerPage": items.len() },
        "items": items,
    })
}

/// Comments are `(text, author)`.
pub(crate) fn comment_page(comments: &[(&str, &str)], next_page_token: Option<&str>) -> Value {
    let items: Vec<Value> = comments
        .iter()
        .enumerate()
        .map(|(i, (text, author))| {
            json!({
                "kind": "youtube#commentThread",
                "id": format!("thread-{i}"),
                "snippet": {
                    "videoId": "v",
                    "totalReplyCount": 0,
                    "topLevelComment": {
                        "kind": "youtube#comment",
                        "id": format!("comment-{i}"),
                        "snippet": {
                            "textOriginal": text,
                            "textDisplay": text,
                            "authorDisplayName": author,
                            "publishedAt": "2024-03-02T08:30:00Z",
                            "likeCount": 1
                        }
                    }
                }
            })
        })
        .collect();
    let mut page = json!({
        "kind": "youtube#commentThreadListResponse",
        "pageInfo": { "totalResults": items.len(), "resultsPerPage": 100 },
        "items": items,
    });
    if let Some(token) = next_page_token {
        page["nextPageToken"] = json!(token);
    }
    page
}
