use std::collections::HashSet;
use std::time::Duration;

use drivelist_core::{DirectoryEntry, DriveClient, DriveError, ListingPage, ListingQuery};
use log::{debug, warn};

use super::time_range::ItemCap;

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

// Root fetch errors propagate. A failed continuation ends the stream and
// keeps what was already emitted.
pub struct PageStream {
    client: DriveClient,
    query: ListingQuery,
    cap: ItemCap,
    page_delay: Duration,
    cursor: Option<String>,
    seen: HashSet<String>,
    emitted: usize,
    pages: usize,
    started: bool,
    finished: bool,
}

impl PageStream {
    pub fn new(client: DriveClient, query: ListingQuery, cap: ItemCap) -> Self {
        Self {
            client,
            query,
            cap,
            page_delay: DEFAULT_PAGE_DELAY,
            cursor: None,
            seen: HashSet::new(),
            emitted: 0,
            pages: 0,
            started: false,
            finished: false,
        }
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn widened(&self) -> Self {
        Self::new(self.client.clone(), self.query.without_time_bound(), self.cap)
            .with_page_delay(self.page_delay)
    }

    pub fn query(&self) -> &ListingQuery {
        &self.query
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub async fn next_batch(&mut self) -> Result<Option<Vec<DirectoryEntry>>, DriveError> {
        if self.finished {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            let page = match self
                .client
                .fetch_page(&self.query, self.cap.page_size_hint(), None)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            };
            return Ok(Some(self.accept(page)));
        }

        let Some(cursor) = self.cursor.take() else {
            self.finished = true;
            return Ok(None);
        };
        tokio::time::sleep(self.page_delay).await;
        let page_size = u32::try_from(self.cap.remaining(self.emitted))
            .unwrap_or(u32::MAX)
            .min(self.cap.page_size_hint());
        match self
            .client
            .fetch_page(&self.query, page_size, Some(&cursor))
            .await
        {
            Ok(page) => Ok(Some(self.accept(page))),
            Err(err) => {
                warn!(
                    "pagination stopped after {} entries: {err}",
                    self.emitted
                );
                self.finished = true;
                Ok(None)
            }
        }
    }

    fn accept(&mut self, page: ListingPage) -> Vec<DirectoryEntry> {
        self.pages += 1;
        let remaining = self.cap.remaining(self.emitted);
        let batch: Vec<DirectoryEntry> = page
            .entries
            .into_iter()
            .filter(|entry| self.seen.insert(entry.id.clone()))
            .take(remaining)
            .collect();
        self.emitted += batch.len();

        self.cursor = if self.cap.is_reached(self.emitted) {
            None
        } else {
            page.next_cursor
        };
        if self.cursor.is_none() {
            self.finished = true;
        }
        debug!(
            "page {} accepted {} entries (total {}, more={})",
            self.pages,
            batch.len(),
            self.emitted,
            !self.finished
        );
        batch
    }
}
