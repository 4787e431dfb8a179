//! Polite concurrent HTTP client: UA rotation, jittered pacing, bounded
//! retries with exponential backoff on throttling.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::{self, JITTER_RANGE_SECS};
use crate::error::{AppError, Result};

/// Build an HTTP client with a randomly chosen UA from the fixed pool and
/// the engine's standard headers/timeout/redirect policy.
pub fn create_client() -> Client {
    let mut rng = rand::thread_rng();
    let user_agent = config::USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(config::USER_AGENTS[0]);

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        "text/html".parse().expect("static header value"),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        "en-US,en;q=0.9".parse().expect("static header value"),
    );

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(config::REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("failed to build HTTP client")
}

async fn jitter_sleep() {
    let (lo, hi) = JITTER_RANGE_SECS;
    let secs = rand::thread_rng().gen_range(lo..hi);
    sleep(Duration::from_secs_f64(secs)).await;
}

/// Acquire `semaphore`, jitter-sleep, then GET `url` with exponential
/// backoff on 429/503 or transport errors, up to `max_retries` attempts.
pub async fn request_with_backoff(
    client: &Client,
    url: &str,
    semaphore: &Arc<Semaphore>,
    max_retries: u32,
    base_delay: Duration,
) -> Result<String> {
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|e| AppError::network(format!("semaphore closed: {e}")))?;

    jitter_sleep().await;

    let mut attempt = 0;
    loop {
        let outcome = client.get(url).send().await;
        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .text()
                        .await
                        .map_err(|e| AppError::network(format!("reading body: {e}")));
                }
                if (status == StatusCode::TOO_MANY_REQUESTS
                    || status == StatusCode::SERVICE_UNAVAILABLE)
                    && attempt < max_retries
                {
                    log::warn!(
                        "[fetcher] {} returned {}, retrying (attempt {}/{})",
                        url,
                        status,
                        attempt + 1,
                        max_retries
                    );
                    sleep(base_delay * 2u32.pow(attempt)).await;
                    attempt += 1;
                    continue;
                }
                if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Err(AppError::RateLimited {
                        url: url.to_string(),
                        attempts: attempt + 1,
                    });
                }
                return Err(AppError::network(format!("{} returned {}", url, status)));
            }
            Err(e) if attempt < max_retries => {
                log::warn!(
                    "[fetcher] transport error for {} ({}), retrying (attempt {}/{})",
                    url,
                    e,
                    attempt + 1,
                    max_retries
                );
                sleep(base_delay * 2u32.pow(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(AppError::network(e.to_string())),
        }
    }
}

/// Listing requests bypass the semaphore (low rate) but still apply
/// inter-page jitter.
pub async fn request_listing_with_backoff(
    client: &Client,
    url: &str,
    max_retries: u32,
    base_delay: Duration,
) -> Result<String> {
    let unbounded = Arc::new(Semaphore::new(1));
    request_with_backoff(client, url, &unbounded, max_retries, base_delay).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_immediately_on_200() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let client = create_client();
        let sem = Arc::new(Semaphore::new(1));
        let url = format!("{}/ok", server.url());
        let body = request_with_backoff(&client, &url, &sem, 3, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/flaky")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/flaky")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = create_client();
        let sem = Arc::new(Semaphore::new(1));
        let url = format!("{}/flaky", server.url());
        let body = request_with_backoff(&client, &url, &sem, 3, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(body, "ok");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_rate_limited_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/down")
            .with_status(503)
            .expect(4) // initial attempt + 3 retries
            .create_async()
            .await;

        let client = create_client();
        let sem = Arc::new(Semaphore::new(1));
        let url = format!("{}/down", server.url());
        let err = request_with_backoff(&client, &url, &sem, 3, Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited { attempts: 4, .. }));
        mock.assert_async().await;
    }
}
