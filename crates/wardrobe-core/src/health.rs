//! Admin UI readiness polling

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, sleep};

#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Poll `url` every `interval` until it answers below 400 or `timeout`
    /// elapses. Never fails; `false` means "not ready yet".
    async fn poll_until_ready(&self, url: &str, interval: Duration, timeout: Duration) -> bool;
}

/// HTTP GET poller
pub struct HttpHealthPoller {
    client: reqwest::Client,
}

impl HttpHealthPoller {
    /// `request_timeout` bounds each individual request
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    async fn check(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::debug!("Health check {} -> {}", url, status);
                status < 400
            }
            Err(e) => {
                tracing::debug!("Health check {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthPoller {
    async fn poll_until_ready(&self, url: &str, interval: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if self.check(url).await {
                tracing::info!("{} ready after {} attempt(s)", url, attempts);
                return true;
            }
            if Instant::now() + interval >= deadline {
                tracing::warn!("{} not ready after {}s", url, timeout.as_secs());
                return false;
            }
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    fn poller() -> HttpHealthPoller {
        HttpHealthPoller::new(Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_ready_immediately() {
        let base = serve(Router::new().route("/", get(|| async { "wg-easy" }))).await;
        assert!(
            poller()
                .poll_until_ready(&format!("{}/", base), Duration::from_millis(50), Duration::from_secs(2))
                .await
        );
    }

    #[tokio::test]
    async fn test_becomes_ready() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/",
            get(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::FOUND
                    }
                }
            }),
        );
        let base = serve(app).await;

        assert!(
            poller()
                .poll_until_ready(&format!("{}/", base), Duration::from_millis(50), Duration::from_secs(5))
                .await
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_without_error() {
        let app = Router::new().route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let base = serve(app).await;

        let started = std::time::Instant::now();
        let ready = poller()
            .poll_until_ready(&format!("{}/", base), Duration::from_millis(50), Duration::from_millis(300))
            .await;
        assert!(!ready);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        assert!(
            !poller()
                .poll_until_ready(&url, Duration::from_millis(20), Duration::from_millis(100))
                .await
        );
    }
}
