use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{FeedKind, LoadError};

#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl FeedConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            connect_timeout: timeout.min(Duration::from_secs(5)),
        }
    }

    pub fn endpoint(&self, feed: FeedKind) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), feed.path())
    }
}

/// The three payloads exactly as received, handed to fusion untouched.
#[derive(Clone, Debug)]
pub struct RawFeeds {
    pub graph: Value,
    pub final_risk: Value,
    pub risk_scores: Value,
}

/// Blocking entry point for the loader thread: runs the three requests on a
/// private single-threaded runtime.
pub fn fetch_feeds(config: &FeedConfig) -> Result<RawFeeds, LoadError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| LoadError::Runtime(error.to_string()))?;

    runtime.block_on(fetch_feeds_async(config))
}

async fn fetch_feeds_async(config: &FeedConfig) -> Result<RawFeeds, LoadError> {
    let client = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|error| LoadError::Runtime(error.to_string()))?;

    info!(base_url = %config.base_url, "loading risk feeds");
    join_feeds(
        fetch_json(&client, config, FeedKind::Graph),
        fetch_json(&client, config, FeedKind::FinalRisk),
        fetch_json(&client, config, FeedKind::RiskScores),
    )
    .await
}

async fn fetch_json(client: &Client, config: &FeedConfig, feed: FeedKind) -> Result<Value, LoadError> {
    let url = config.endpoint(feed);
    debug!(%url, "requesting feed");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|error| transport_error(feed, error, config.timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            feed,
            status: status.as_u16(),
        });
    }

    let payload = response.json::<Value>().await.map_err(|error| {
        if error.is_timeout() {
            transport_error(feed, error, config.timeout)
        } else {
            LoadError::Decode {
                feed,
                message: error.to_string(),
            }
        }
    })?;

    debug!(%feed, payload = %payload, "received feed");
    Ok(payload)
}

fn transport_error(feed: FeedKind, error: reqwest::Error, timeout: Duration) -> LoadError {
    if error.is_timeout() {
        LoadError::Timeout {
            feed,
            seconds: timeout.as_secs(),
        }
    } else {
        LoadError::Transport {
            feed,
            message: error.to_string(),
        }
    }
}

/// All-or-nothing barrier over the three feeds. The first failure wins and
/// the remaining requests are dropped.
pub(super) async fn join_feeds<G, F, R>(
    graph: G,
    final_risk: F,
    risk_scores: R,
) -> Result<RawFeeds, LoadError>
where
    G: Future<Output = Result<Value, LoadError>>,
    F: Future<Output = Result<Value, LoadError>>,
    R: Future<Output = Result<Value, LoadError>>,
{
    let (graph, final_risk, risk_scores) = tokio::try_join!(graph, final_risk, risk_scores)
        .inspect_err(|error| warn!(%error, "feed load aborted"))?;

    Ok(RawFeeds {
        graph,
        final_risk,
        risk_scores,
    })
}

#[cfg(test)]
mod tests {
    use std::future::{pending, ready};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use serde_json::json;

    use super::*;

    fn ok(value: Value) -> impl Future<Output = Result<Value, LoadError>> {
        ready(Ok(value))
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let config = FeedConfig::new("http://127.0.0.1:8000/api/", Duration::from_secs(3));
        assert_eq!(
            config.endpoint(FeedKind::FinalRisk),
            "http://127.0.0.1:8000/api/final-risk/"
        );
        assert_eq!(
            config.endpoint(FeedKind::Graph),
            "http://127.0.0.1:8000/api/graph/"
        );
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn join_returns_all_three_payloads() {
        let feeds = join_feeds(
            ok(json!({"nodes": []})),
            ok(json!({"wallets": [1]})),
            ok(json!({"wallets": [2]})),
        )
        .await
        .expect("all feeds succeed");

        assert_eq!(feeds.graph, json!({"nodes": []}));
        assert_eq!(feeds.final_risk, json!({"wallets": [1]}));
        assert_eq!(feeds.risk_scores, json!({"wallets": [2]}));
    }

    #[tokio::test]
    async fn join_fails_when_final_risk_fails() {
        let result = join_feeds(
            ok(json!({"nodes": [], "edges": []})),
            ready(Err(LoadError::Status {
                feed: FeedKind::FinalRisk,
                status: 500,
            })),
            ok(json!({"wallets": []})),
        )
        .await;

        let error = result.expect_err("second feed failed");
        assert_eq!(error.feed(), Some(FeedKind::FinalRisk));
        assert!(matches!(error, LoadError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn join_does_not_wait_for_slow_feeds_after_a_failure() {
        let result = join_feeds(
            pending::<Result<Value, LoadError>>(),
            pending::<Result<Value, LoadError>>(),
            ready(Err(LoadError::Decode {
                feed: FeedKind::RiskScores,
                message: "expected value".to_owned(),
            })),
        )
        .await;

        assert_eq!(
            result.expect_err("third feed failed").feed(),
            Some(FeedKind::RiskScores)
        );
    }

    fn read_request(stream: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buffer = [0_u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            match stream.read(&mut buffer) {
                Ok(0) | Err(_) => return,
                Ok(read) => request.extend_from_slice(&buffer[..read]),
            }
        }
    }

    /// Answers every request with the same canned response. Returns the
    /// base URL to point a `FeedConfig` at.
    fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let address = listener.local_addr().expect("listener address");
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                read_request(&mut stream);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{address}/api")
    }

    /// Accepts connections and never answers them.
    fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let address = listener.local_addr().expect("listener address");
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        format!("http://{address}/api")
    }

    #[test]
    fn server_error_status_fails_the_load() {
        let config = FeedConfig::new(serve("500 Internal Server Error", "{}"), Duration::from_secs(5));

        let error = fetch_feeds(&config).expect_err("500 must fail the load");
        assert!(
            matches!(error, LoadError::Status { status: 500, .. }),
            "unexpected error: {error:?}"
        );
        assert!(error.feed().is_some());
    }

    #[test]
    fn malformed_body_fails_the_load() {
        let config = FeedConfig::new(serve("200 OK", "nope!"), Duration::from_secs(5));

        let error = fetch_feeds(&config).expect_err("invalid JSON must fail the load");
        assert!(
            matches!(error, LoadError::Decode { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn well_formed_feeds_are_returned_untouched() {
        let config = FeedConfig::new(serve("200 OK", r#"{"wallets":[]}"#), Duration::from_secs(5));

        let feeds = fetch_feeds(&config).expect("all feeds answer with JSON");
        assert_eq!(feeds.graph, json!({"wallets": []}));
        assert_eq!(feeds.final_risk, json!({"wallets": []}));
        assert_eq!(feeds.risk_scores, json!({"wallets": []}));
    }

    #[test]
    fn silent_server_times_out() {
        let config = FeedConfig::new(serve_silence(), Duration::from_secs(1));

        let error = fetch_feeds(&config).expect_err("no answer must time out");
        assert!(
            matches!(error, LoadError::Timeout { seconds: 1, .. }),
            "unexpected error: {error:?}"
        );
    }
}
