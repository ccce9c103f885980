use super::navigation::poll_until;
use crate::core::PageSurface;
use crate::dom::{ElementHandle, Locator};
use std::time::Duration;

/// Bounded waits on element state. Each returns whether the condition was
/// met before the ceiling; none of them fail.
pub struct ElementMonitor;

impl ElementMonitor {
    /// At least one element matches `locator`.
    pub async fn wait_for_element<P: PageSurface + ?Sized>(
        page: &P,
        locator: &Locator,
        frame: Option<usize>,
        timeout: Duration,
    ) -> bool {
        poll_until(timeout, move || async move {
            page.count(locator, frame).await.map(|n| n > 0)
        })
        .await
    }

    pub async fn wait_until_visible<P: PageSurface + ?Sized>(
        page: &P,
        element: &ElementHandle,
        timeout: Duration,
    ) -> bool {
        poll_until(timeout, move || async move { page.is_visible(element).await }).await
    }

    pub async fn wait_until_enabled<P: PageSurface + ?Sized>(
        page: &P,
        element: &ElementHandle,
        timeout: Duration,
    ) -> bool {
        poll_until(timeout, move || async move { page.is_enabled(element).await }).await
    }
}
