use channel_stats::config::Config;
use channel_stats::server::{self, AppState};
use channel_stats::youtube_api::{CredentialPool, YouTubeClient};
use eyre::Context;
use std::io::IsTerminal;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        return Err(e).context("load .env");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let config = Config::from_env().context("read configuration")?;

    let credentials = Arc::new(
        CredentialPool::new(config.api_keys.iter().map(String::as_str))
            .context("build API key pool")?,
    );
    tracing::info!(keys = credentials.len(), "loaded YouTube API keys");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("build HTTP client")?;
    let client = YouTubeClient::new(credentials, http)
        .with_base_url(config.api_base_url.clone())
        .with_max_pages(config.max_pages);

    let state = Arc::new(AppState {
        client,
        failure_policy: config.failure_policy,
        fetch_timeout: config.fetch_timeout,
    });

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(
        %addr,
        failure_policy = %config.failure_policy,
        "server is running"
    );

    server::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c");
    })
    .await
}
