use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode, header::RETRY_AFTER};
use tracing::{debug, info, warn};

use crate::{
    error::ReportError,
    model::ForecastRequest,
    request::{FORECAST_URL, query_params},
};

/// Anything that can answer a forecast request with a raw response body.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn fetch(&self, request: &ForecastRequest) -> Result<String, ReportError>;
}

/// How often and on what a request is repeated.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the n-th retry is `backoff_factor * 2^(n-1)`.
    pub backoff_factor: Duration,
    pub retry_statuses: Vec<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
            retry_statuses: vec![
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, retry: u32) -> Duration {
        self.backoff_factor * 2u32.saturating_pow(retry.saturating_sub(1))
    }

    fn should_retry(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Statuses whose `Retry-After` header overrides the computed backoff.
const RETRY_AFTER_STATUSES: [StatusCode; 2] =
    [StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE];

fn retry_after(res: &Response) -> Option<Duration> {
    if !RETRY_AFTER_STATUSES.contains(&res.status()) {
        return None;
    }
    let value = res.headers().get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

/// `Retry-After` is either delay-seconds or an HTTP date. Dates in the past
/// mean no wait.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Open-Meteo forecast client with a per-request timeout and retry policy.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenMeteoClient {
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Self, ReportError> {
        Self::with_options(FORECAST_URL, Self::TIMEOUT, RetryPolicy::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ReportError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("weather-report/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReportError::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url: base_url.into(), timeout, retry })
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn fetch(&self, request: &ForecastRequest) -> Result<String, ReportError> {
        let params = query_params(request);
        let attempts = self.retry.max_retries + 1;

        for attempt in 1..=attempts {
            debug!("Calling Open-Meteo API (attempt {attempt}/{attempts})");

            let (failure, server_wait) = match self
                .http
                .get(&self.base_url)
                .query(&params)
                .send()
                .await
            {
                Ok(res) => {
                    let status = res.status();
                    if status.is_success() {
                        info!("Open-Meteo responded {status} on attempt {attempt}");
                        return res.text().await.map_err(|e| {
                            ReportError::FetchFailed(format!("failed to read response body: {e}"))
                        });
                    }
                    if !self.retry.should_retry(status) {
                        let body = res.text().await.unwrap_or_default();
                        return Err(ReportError::FetchFailed(format!(
                            "request failed with status {status}: {}",
                            truncate_body(&body)
                        )));
                    }
                    (format!("status {status}"), retry_after(&res))
                }
                Err(e) if e.is_connect() => (format!("connection error: {e}"), None),
                Err(e) if e.is_timeout() => {
                    return Err(ReportError::FetchFailed(format!(
                        "request timed out after {:?}",
                        self.timeout
                    )));
                }
                Err(e) if e.is_redirect() => {
                    return Err(ReportError::FetchFailed(format!("too many redirects: {e}")));
                }
                Err(e) => return Err(ReportError::FetchFailed(e.to_string())),
            };

            if attempt == attempts {
                return Err(ReportError::FetchFailed(format!(
                    "giving up after {attempts} attempts, last failure: {failure}"
                )));
            }

            let wait = server_wait.unwrap_or_else(|| self.retry.backoff(attempt));
            warn!("Transient failure ({failure}), retrying in {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }

        Err(ReportError::FetchFailed(format!("request failed after {attempts} attempts")))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, ForecastDays};
    use chrono::TimeZone;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// (status, extra header lines, body)
    type Reply = (u16, &'static str, &'static str);

    /// Serves the given replies in order, one per connection.
    /// Returns the base URL, a hit counter, and the last seen request line.
    async fn stub_server(replies: Vec<Reply>) -> (String, Arc<AtomicUsize>, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(String::new()));

        let counter = hits.clone();
        let seen = last_request.clone();
        tokio::spawn(async move {
            for (status, headers, body) in replies {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                *seen.lock().unwrap() = head.lines().next().unwrap_or_default().to_string();
                counter.fetch_add(1, Ordering::SeqCst);

                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n{headers}\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/v1/forecast"), hits, last_request)
    }

    /// Accepts connections and never answers them.
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });

        (format!("http://{addr}/v1/forecast"), hits)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy { backoff_factor: Duration::from_millis(5), ..RetryPolicy::default() }
    }

    fn client(url: String, retry: RetryPolicy) -> OpenMeteoClient {
        OpenMeteoClient::with_options(url, Duration::from_secs(5), retry).unwrap()
    }

    fn request() -> ForecastRequest {
        ForecastRequest {
            coordinate: Coordinate::new(51.5074, -0.1278).unwrap(),
            forecast_days: Some(ForecastDays::new(2).unwrap()),
        }
    }

    const OK_BODY: &str = r#"{"current_weather":{"temperature":15.2,"weathercode":3}}"#;

    #[test]
    fn backoff_doubles_from_factor() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn default_policy_retries_transient_statuses_only() {
        let policy = RetryPolicy::default();
        for code in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry(StatusCode::from_u16(code).unwrap()));
        }
        for code in [400, 401, 404, 501] {
            assert!(!policy.should_retry(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn retry_after_seconds_and_dates() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        assert_eq!(parse_retry_after("7", now), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 0 ", now), Some(Duration::ZERO));
        assert_eq!(
            parse_retry_after("Wed, 01 May 2024 09:00:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after("Wed, 01 May 2024 08:00:00 GMT", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn truncate_body_limits_length() {
        let long = "x".repeat(300);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn retries_503_then_succeeds() {
        let (url, hits, last_request) =
            stub_server(vec![(503, "", "unavailable"), (200, "", OK_BODY)]).await;

        let body = client(url, fast_retry()).fetch(&request()).await.unwrap();

        assert_eq!(body, OK_BODY);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let line = last_request.lock().unwrap().clone();
        assert!(line.starts_with("GET /v1/forecast?"));
        assert!(line.contains("current_weather=true"));
        assert!(line.contains("timezone=auto"));
        assert!(line.contains("forecast_days=2"));
    }

    #[tokio::test]
    async fn retry_after_header_replaces_backoff() {
        let (url, hits, _) = stub_server(vec![
            (429, "retry-after: 0\r\n", "slow down"),
            (200, "", OK_BODY),
        ])
        .await;
        let slow =
            RetryPolicy { backoff_factor: Duration::from_secs(60), ..RetryPolicy::default() };

        let body = tokio::time::timeout(
            Duration::from_secs(5),
            client(url, slow).fetch(&request()),
        )
        .await
        .expect("Retry-After: 0 should skip the 60s backoff")
        .unwrap();

        assert_eq!(body, OK_BODY);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let (url, hits, _) = stub_server(vec![(404, "", "not found"), (200, "", OK_BODY)]).await;

        let err = client(url, fast_retry()).fetch(&request()).await.unwrap_err();

        assert!(matches!(err, ReportError::FetchFailed(ref msg) if msg.contains("404")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_all_retries() {
        let (url, hits, _) =
            stub_server(vec![(503, "", "a"), (502, "", "b"), (500, "", "c"), (504, "", "d")])
                .await;

        let err = client(url, fast_retry()).fetch(&request()).await.unwrap_err();

        assert!(matches!(err, ReportError::FetchFailed(ref msg) if msg.contains("4 attempts")));
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn timeout_fails_without_retry() {
        let (url, hits) = silent_server().await;
        let client =
            OpenMeteoClient::with_options(url, Duration::from_millis(200), fast_retry()).unwrap();

        let err = client.fetch(&request()).await.unwrap_err();

        assert!(matches!(err, ReportError::FetchFailed(ref msg) if msg.contains("timed out")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connection_refused_is_retried() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}/v1/forecast"), fast_retry())
            .fetch(&request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReportError::FetchFailed(ref msg)
                if msg.contains("4 attempts") && msg.contains("connection error")
        ));
    }

    #[tokio::test]
    async fn redirect_loop_fails() {
        let (url, hits, _) =
            stub_server(vec![(302, "location: /v1/forecast\r\n", ""); 20]).await;

        let err = client(url, fast_retry()).fetch(&request()).await.unwrap_err();

        assert!(matches!(err, ReportError::FetchFailed(ref msg) if msg.contains("redirect")));
        assert!(hits.load(Ordering::SeqCst) > 1);
    }
}
