//! Page-at-a-time collection for Mealie's paginated list endpoints.

use std::future::Future;

use serde::Deserialize;
use tracing::debug;

use mealiesync_shared::Result;

/// Number of items requested per page.
pub(crate) const PER_PAGE: u32 = 200;

/// Envelope shared by all paginated list responses.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
}

/// Fetch pages starting at 1 until the last reported page has been read.
///
/// The page count is taken from the most recent response, so a collection
/// that grows or shrinks mid-walk is followed on a best-effort basis.
pub(crate) async fn collect_pages<T, F, Fut>(what: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut page = 1;
    let mut last_page = 1;
    let mut items = Vec::new();

    while page <= last_page {
        let response = fetch(page).await?;
        debug!(what, page, count = response.items.len(), "retrieved page");
        last_page = response.total_pages;
        items.extend(response.items);
        page += 1;
    }

    debug!(what, total = items.len(), "retrieved all pages");
    Ok(items)
}
