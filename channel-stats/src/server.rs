//! The HTTP front end: `POST /getInformation`.
//!
//! Connections are served with hyper's HTTP/1 connection builder, one task per connection.
//! Every response body is JSON: `{ "success": true, "data": ... }` on success and
//! `{ "success": false, "message": ... }` otherwise.

use crate::report::ChannelReport;
use crate::snapshot::{self, ChannelSnapshot};
use crate::youtube_api::YouTubeClient;
use eyre::Context;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// What to answer when fetching a channel fails.
///
/// `Degrade` answers `200` with an all-zero report, so callers cannot tell a failure apart
/// from a channel without videos. `Error` answers `500` with the error message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineFailurePolicy {
    #[default]
    Degrade,
    Error,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pipeline failure policy '{0}' (expected 'degrade' or 'error')")]
pub struct UnknownPolicy(String);

impl FromStr for PipelineFailurePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "error" => Ok(Self::Error),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for PipelineFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineFailurePolicy::Degrade => write!(f, "degrade"),
            PipelineFailurePolicy::Error => write!(f, "error"),
        }
    }
}

/// Everything a request handler needs, shared by all connections.
#[derive(Debug)]
pub struct AppState {
    pub client: YouTubeClient,
    pub failure_policy: PipelineFailurePolicy,
    /// Upper bound on one channel fetch
    pub fetch_timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct InformationRequest {
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct Success<'a> {
    success: bool,
    data: &'a ChannelReport,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    success: bool,
    message: &'a str,
}

const UNKNOWN_ERROR: &str = "Unknown error occurred.";

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// After shutdown no new connections are accepted; connections already open are asked to
/// finish their current request and close, and this function returns once they have.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> eyre::Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (conn, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        // e.g. out of file descriptors; keep serving the connections we have
                        back_off_after_accept_error(&e).await;
                        continue;
                    }
                };
                tracing::trace!(%peer, "accepted connection");
                connections.spawn(serve_connection(conn, state.clone(), stop_rx.clone()));
            }
            () = &mut shutdown => {
                tracing::info!(
                    open_connections = connections.len(),
                    "shutting down, waiting for open connections"
                );
                break;
            }
            // reap finished connections so the set doesn't grow without bound
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    stop_tx
        .send(true)
        .context("notify connections of shutdown")?;
    while connections.join_next().await.is_some() {}
    Ok(())
}

/// Pause before accepting again, so a persistent accept error doesn't spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

async fn back_off_after_accept_error(error: &std::io::Error) {
    tracing::warn!(
        error = %error,
        retry_in = ?ACCEPT_ERROR_BACKOFF,
        "failed to accept connection"
    );
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

async fn serve_connection(
    conn: tokio::net::TcpStream,
    state: Arc<AppState>,
    mut stop: watch::Receiver<bool>,
) {
    let conn = hyper_util::rt::TokioIo::new(conn);
    let service = service_fn(move |req| handle(state.clone(), req));
    let mut serve =
        std::pin::pin!(hyper::server::conn::http1::Builder::new().serve_connection(conn, service));

    let stopped = async move {
        // a closed channel means the accept loop is gone, which is also a stop
        let _ = stop.wait_for(|stop| *stop).await;
    };

    let result = tokio::select! {
        result = &mut serve => result,
        () = stopped => {
            serve.as_mut().graceful_shutdown();
            serve.await
        }
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "connection closed with error");
    }
}

/// Routes one request.
///
/// Generic over the body type so it can be driven without a socket.
pub async fn handle<B>(
    state: Arc<AppState>,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: fmt::Display,
{
    let response = match (req.method(), req.uri().path()) {
        (&Method::POST, "/getInformation") => get_information(&state, req.into_body()).await,
        (method, path) => {
            tracing::debug!(%method, path, "no such route");
            failure(StatusCode::NOT_FOUND, &format!("no route for {method} {path}"))
        }
    };
    Ok(response)
}

async fn get_information<B>(state: &AppState, body: B) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: fmt::Display,
{
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return failure(StatusCode::BAD_REQUEST, &format!("read request body: {e}"));
        }
    };
    let request: InformationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return failure(StatusCode::BAD_REQUEST, &format!("invalid request body: {e}"));
        }
    };
    let Some(channel_id) = request.channel_id.filter(|id| !id.trim().is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "channelId is required");
    };

    tracing::info!(channel_id, "new information request");

    let snapshot = match snapshot::fetch_channel_snapshot_within(
        &state.client,
        &channel_id,
        state.fetch_timeout,
    )
    .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let message = error_chain(&e);
            match state.failure_policy {
                PipelineFailurePolicy::Degrade => {
                    tracing::error!(
                        channel_id,
                        error = %message,
                        "channel fetch failed, answering with an empty report"
                    );
                    ChannelSnapshot::empty()
                }
                PipelineFailurePolicy::Error => {
                    tracing::error!(channel_id, error = %message, "channel fetch failed");
                    return failure(StatusCode::INTERNAL_SERVER_ERROR, &message);
                }
            }
        }
    };

    let report = ChannelReport::from(snapshot);
    match serde_json::to_vec(&Success {
        success: true,
        data: &report,
    }) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize report");
            failure(StatusCode::INTERNAL_SERVER_ERROR, UNKNOWN_ERROR)
        }
    }
}

/// Renders an error and all of its sources as `outer: inner: innermost`.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn failure(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(&Failure {
        success: false,
        message,
    })
    .unwrap_or_else(|_| br#"{"success":false,"message":"Unknown error occurred."}"#.to_vec());
    json_response(status, body)
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube_api::mock::{self, MockYouTube};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn state(mock: &MockYouTube, failure_policy: PipelineFailurePolicy) -> Arc<AppState> {
        Arc::new(AppState {
            client: mock.client(&["k0", "k1"]),
            failure_policy,
            fetch_timeout: None,
        })
    }

    async fn call(
        state: Arc<AppState>,
        method: Method,
        path: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        let response = handle(state, req).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn two_videos(req: &mock::RecordedRequest) -> (StatusCode, Value) {
        match req.endpoint.as_str() {
            "channels" => (StatusCode::OK, mock::channel_page("UC1", 77)),
            "search" => (StatusCode::OK, mock::search_page(&["v1", "v2"], None)),
            "videos" => (
                StatusCode::OK,
                mock::video_page(&[("v1", "One", 100, 7, 1), ("v2", "Two", 23, 3, 1)]),
            ),
            "commentThreads" => (
                StatusCode::OK,
                mock::comment_page(&[("first!", "early bird")], None),
            ),
            other => panic!("unexpected endpoint {other}"),
        }
    }

    #[tokio::test]
    async fn returns_totals_for_a_channel() {
        let mock = MockYouTube::start(two_videos).await;

        let (status, body) = call(
            state(&mock, PipelineFailurePolicy::Degrade),
            Method::POST,
            "/getInformation",
            r#"{"channelId":"UC1"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        let data = &body["data"];
        assert_eq!(data["totalViews"], json!(123));
        assert_eq!(data["totalLikes"], json!(10));
        assert_eq!(data["totalComments"], json!(2));
        assert_eq!(data["subscribers"], json!(77));
        let videos = data["videos"].as_array().unwrap();
        assert_eq!(videos.len(), 2);
        for video in videos {
            assert_eq!(video["commentsArray"].as_array().unwrap().len(), 1);
        }
        assert_eq!(
            videos[0]["link"],
            json!("https://www.youtube.com/watch?v=v1")
        );
    }

    #[tokio::test]
    async fn degrade_policy_answers_with_empty_report() {
        let mock = MockYouTube::start(|_| {
            (StatusCode::BAD_REQUEST, mock::api_error(400, "invalidChannelId"))
        })
        .await;

        let (status, body) = call(
            state(&mock, PipelineFailurePolicy::Degrade),
            Method::POST,
            "/getInformation",
            r#"{"channelId":"bogus"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "data": {
                    "totalViews": 0,
                    "totalLikes": 0,
                    "totalComments": 0,
                    "subscribers": 0,
                    "videos": []
                }
            })
        );
    }

    #[tokio::test]
    async fn error_policy_answers_with_500() {
        let mock = MockYouTube::start(|_| (StatusCode::FORBIDDEN, mock::quota_error())).await;

        let (status, body) = call(
            state(&mock, PipelineFailurePolicy::Error),
            Method::POST,
            "/getInformation",
            r#"{"channelId":"UC1"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["message"],
            json!("fetch channel statistics: all 2 API keys have reached their limits")
        );
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let mock = MockYouTube::start(two_videos).await;

        for body in ["not json", "{}", r#"{"channelId":""}"#] {
            let (status, response) = call(
                state(&mock, PipelineFailurePolicy::Degrade),
                Method::POST,
                "/getInformation",
                body,
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(response["success"], json!(false));
        }
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let mock = MockYouTube::start(two_videos).await;

        let (status, body) = call(
            state(&mock, PipelineFailurePolicy::Degrade),
            Method::GET,
            "/getInformation",
            "",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn serves_over_tcp_and_shuts_down() {
        let mock = MockYouTube::start(two_videos).await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            state(&mock, PipelineFailurePolicy::Degrade),
            async {
                let _ = stop_rx.await;
            },
        ));

        let response: Value = reqwest::Client::new()
            .post(format!("http://{addr}/getInformation"))
            .json(&json!({ "channelId": "UC1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response["data"]["totalViews"], json!(123));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn accept_errors_pause_before_retrying() {
        let error = std::io::Error::other("too many open files");
        let started = tokio::time::Instant::now();

        back_off_after_accept_error(&error).await;

        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[test]
    fn parses_failure_policy() {
        assert_eq!(
            "degrade".parse::<PipelineFailurePolicy>().unwrap(),
            PipelineFailurePolicy::Degrade
        );
        assert_eq!(
            " ERROR ".parse::<PipelineFailurePolicy>().unwrap(),
            PipelineFailurePolicy::Error
        );
        assert!("ignore".parse::<PipelineFailurePolicy>().is_err());
    }
}
