use crate::core::PageSurface;
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Ceiling for the address read that closes out a wait.
pub const ADDRESS_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Polls `check` until it reports true or `timeout` elapses.
///
/// Errors count as "not yet"; the driver is often mid-navigation when a poll
/// lands.
pub async fn poll_until<F, Fut, E>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::fmt::Display,
{
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, check()).await {
            Ok(Ok(true)) => return true,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => debug!("check failed, retrying: {}", e),
            Err(_) => return false,
        }

        if Instant::now() + POLL_INTERVAL > deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

pub struct NavigationManager;

impl NavigationManager {
    /// Waits until the page address matches `pattern`.
    pub async fn wait_for_url<P: PageSurface + ?Sized>(
        page: &P,
        pattern: &Regex,
        timeout: Duration,
    ) -> NavigationResult {
        let start_time = Instant::now();
        let matched = poll_until(timeout, move || async move {
            page.current_url().await.map(|url| pattern.is_match(&url))
        })
        .await;

        NavigationResult::observe(page, matched, start_time).await
    }

    /// Waits until the page address differs from `previous`.
    pub async fn wait_for_address_change<P: PageSurface + ?Sized>(
        page: &P,
        previous: &str,
        timeout: Duration,
    ) -> NavigationResult {
        let start_time = Instant::now();
        let changed = poll_until(timeout, move || async move {
            page.current_url().await.map(|url| url != previous)
        })
        .await;

        NavigationResult::observe(page, changed, start_time).await
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub success: bool,
    /// Last address seen, matching or not
    pub url: String,
    pub duration_ms: u64,
}

impl NavigationResult {
    async fn observe<P: PageSurface + ?Sized>(
        page: &P,
        success: bool,
        start_time: Instant,
    ) -> Self {
        let url = match tokio::time::timeout(ADDRESS_READ_TIMEOUT, page.current_url()).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                debug!("could not read address: {}", e);
                String::new()
            }
            Err(_) => {
                debug!("address read stalled");
                String::new()
            }
        };
        Self {
            success,
            url,
            duration_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}
