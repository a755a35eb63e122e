use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// One page of a cursor-paginated remote listing. Advancing consumes the
/// page, mirroring the remote cursor's single-use semantics.
#[async_trait]
pub trait ListingPage: Send {
    type Item: Send;

    fn take_items(&mut self) -> Vec<Self::Item>;
    fn has_next_page(&self) -> bool;
    async fn next_page(self: Box<Self>) -> Result<Box<dyn ListingPage<Item = Self::Item>>>;
}

#[derive(Debug, Error)]
#[error("subscription listing failed: {source}")]
pub struct RemoteListingError {
    #[from]
    source: anyhow::Error,
}

/// Drains a paginated listing into a fully materialized sequence. Page
/// fetches are strictly sequential because each cursor depends on the
/// previous page. Any fetch failure discards the partial result; callers
/// must never diff against an incomplete membership view.
pub async fn collect_all_pages<T: Send + 'static>(
    mut page: Box<dyn ListingPage<Item = T>>,
) -> Result<Vec<T>, RemoteListingError> {
    let mut items = page.take_items();
    let mut pages = 1usize;
    while page.has_next_page() {
        page = page.next_page().await?;
        items.extend(page.take_items());
        pages += 1;
    }
    debug!(pages, items = items.len(), "paging: listing drained");
    Ok(items)
}

#[cfg(test)]
#[path = "tests/paging_tests.rs"]
mod tests;
