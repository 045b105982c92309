use async_trait::async_trait;

use scout_core_types::{PageSnapshot, ScrollDirection};

use crate::errors::DriverError;

/// Boundary to the browser automation layer.
///
/// The core never touches a live page directly; everything it needs is a
/// snapshot per observation plus idempotently retriable primitives keyed by
/// element id. Real implementations wrap CDP/WebDriver stacks; tests use
/// [`crate::ScriptedDriver`].
#[async_trait]
pub trait BrowserDriver: Send {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    /// Best-effort history back-navigation.
    async fn back(&mut self) -> Result<(), DriverError>;

    /// Observe the current page: URL, structural DOM summary and the
    /// interactive-element table.
    async fn snapshot(&mut self) -> Result<PageSnapshot, DriverError>;

    async fn click(&mut self, element_id: &str) -> Result<(), DriverError>;

    /// Press-and-hold variant. Drivers without a native gesture fall back to a
    /// plain click.
    async fn long_click(&mut self, element_id: &str) -> Result<(), DriverError> {
        self.click(element_id).await
    }

    async fn fill(&mut self, element_id: &str, text: &str) -> Result<(), DriverError>;

    async fn scroll(
        &mut self,
        element_id: &str,
        direction: ScrollDirection,
    ) -> Result<(), DriverError>;

    /// Whether activating this element would navigate off the allowed origin.
    /// Used as a cheap pre-filter before clicks.
    async fn would_leave_origin(&mut self, element_id: &str) -> Result<bool, DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Close any background pages an action may have opened, keeping the run
    /// single-tab and deterministic.
    async fn close_extra_pages(&mut self) -> Result<(), DriverError>;
}
