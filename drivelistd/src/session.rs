use std::sync::{Arc, Mutex};
use std::time::Duration;

use drivelist_core::{
    DirectoryEntry, DriveClient, DriveError, ErrorClass, ErrorKind, FolderCount, ListingQuery,
    ListingScope, SearchScope,
};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ignore_poison::IgnorePoison;
use crate::sync::enrichment::{EnrichmentOutcome, EnrichmentScheduler, pending_folders};
use crate::sync::fallback::{self, Fallback, FallbackMode};
use crate::sync::generation::{GenerationGuard, LoadTicket};
use crate::sync::navigation::{Crumb, NavigationPath};
use crate::sync::pagination::{DEFAULT_PAGE_DELAY, PageStream};
use crate::sync::stats_cache::StatsCache;
use crate::sync::time_range::{ItemCap, TimeRange};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error("breadcrumb index {0} is out of range")]
    NoSuchCrumb(usize),
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::Drive(err) => err.class(),
            SessionError::NoSuchCrumb(_) => ErrorClass::Request,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub time_range: TimeRange,
    pub item_cap: ItemCap,
    pub page_delay: Duration,
    pub scheduler: EnrichmentScheduler,
    pub fallback: FallbackMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            item_cap: ItemCap::default(),
            page_delay: DEFAULT_PAGE_DELAY,
            scheduler: EnrichmentScheduler::default(),
            fallback: FallbackMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoadStarted {
        generation: u64,
        container_id: String,
    },
    Batch {
        generation: u64,
        entries: Vec<DirectoryEntry>,
    },
    TimeRangeWidened { generation: u64 },
    WiderRangeAvailable { generation: u64, entries: usize },
    LoadFinished { generation: u64, total: usize },
    LoadFailed {
        generation: u64,
        kind: ErrorKind,
        message: String,
    },
    StatsMerged { counts: Vec<(String, FolderCount)> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    FetchingMore,
    Failed(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Completed { entries: usize, widened: bool },
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl LoadFailure {
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListingSummary {
    pub folders: usize,
    pub files: usize,
    pub total: usize,
}

struct SessionState {
    path: NavigationPath,
    search: Option<String>,
    search_scope: SearchScope,
    time_range: TimeRange,
    modified_since: Option<OffsetDateTime>,
    item_cap: ItemCap,
    entries: Vec<DirectoryEntry>,
    status: LoadStatus,
    last_error: Option<LoadFailure>,
    wider_range_entries: Option<usize>,
}

impl SessionState {
    fn active_query(&self) -> ListingQuery {
        let scope = ListingScope::for_filter(
            &self.path.current().id,
            self.search.as_deref(),
            self.search_scope,
        );
        ListingQuery::new(scope).modified_since(self.modified_since)
    }

    fn select_time_range(&mut self, range: TimeRange) {
        self.time_range = range;
        self.modified_since = range.lower_bound(OffsetDateTime::now_utc());
    }

    fn visible<'a>(&'a self, filter: Option<&str>) -> impl Iterator<Item = &'a DirectoryEntry> {
        let needle = filter
            .map(|text| text.trim().to_lowercase())
            .filter(|text| !text.is_empty());
        self.entries.iter().filter(move |entry| match &needle {
            Some(needle) => entry.name.to_lowercase().contains(needle),
            None => true,
        })
    }
}

struct SessionInner {
    client: DriveClient,
    options: SessionOptions,
    guard: GenerationGuard,
    state: Mutex<SessionState>,
    stats: Mutex<StatsCache>,
    enrichment: Mutex<CancellationToken>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

#[derive(Clone)]
pub struct BrowseSession {
    inner: Arc<SessionInner>,
}

impl BrowseSession {
    pub fn new(
        client: DriveClient,
        root_id: impl Into<String>,
        root_name: impl Into<String>,
        options: SessionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let mut state = SessionState {
            path: NavigationPath::new(root_id, root_name),
            search: None,
            search_scope: SearchScope::default(),
            time_range: options.time_range,
            modified_since: None,
            item_cap: options.item_cap,
            entries: Vec::new(),
            status: LoadStatus::Idle,
            last_error: None,
            wider_range_entries: None,
        };
        state.select_time_range(options.time_range);
        let inner = SessionInner {
            client,
            options,
            guard: GenerationGuard::new(),
            state: Mutex::new(state),
            stats: Mutex::new(StatsCache::new()),
            enrichment: Mutex::new(CancellationToken::new()),
            events,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }

    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.inner.state.lock_ignore_poison().entries.clone()
    }

    pub fn visible_entries(&self, filter: Option<&str>) -> Vec<DirectoryEntry> {
        let state = self.inner.state.lock_ignore_poison();
        state.visible(filter).cloned().collect()
    }

    pub fn summary(&self, filter: Option<&str>) -> ListingSummary {
        let state = self.inner.state.lock_ignore_poison();
        state
            .visible(filter)
            .fold(ListingSummary::default(), |mut summary, entry| {
                if entry.is_folder() {
                    summary.folders += 1;
                } else {
                    summary.files += 1;
                }
                summary.total += 1;
                summary
            })
    }

    pub fn folder_count(&self, id: &str) -> Option<FolderCount> {
        self.inner.stats.lock_ignore_poison().get(id)
    }

    pub fn stats(&self) -> StatsCache {
        self.inner.stats.lock_ignore_poison().clone()
    }

    pub fn path(&self) -> Vec<Crumb> {
        self.inner.state.lock_ignore_poison().path.crumbs().to_vec()
    }

    pub fn current_container(&self) -> Crumb {
        self.inner.state.lock_ignore_poison().path.current().clone()
    }

    pub fn time_range(&self) -> TimeRange {
        self.inner.state.lock_ignore_poison().time_range
    }

    pub fn modified_since(&self) -> Option<OffsetDateTime> {
        self.inner.state.lock_ignore_poison().modified_since
    }

    pub fn item_cap(&self) -> ItemCap {
        self.inner.state.lock_ignore_poison().item_cap
    }

    pub fn search(&self) -> Option<String> {
        self.inner.state.lock_ignore_poison().search.clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.state.lock_ignore_poison().status
    }

    pub fn last_error(&self) -> Option<LoadFailure> {
        self.inner.state.lock_ignore_poison().last_error.clone()
    }

    pub fn wider_range_entries(&self) -> Option<usize> {
        self.inner.state.lock_ignore_poison().wider_range_entries
    }

    pub async fn enter_folder(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<LoadOutcome, SessionError> {
        {
            let mut state = self.inner.state.lock_ignore_poison();
            state.path.push(id, name);
            state.search = None;
        }
        self.load().await
    }

    pub async fn navigate_to(&self, index: usize) -> Result<LoadOutcome, SessionError> {
        {
            let mut state = self.inner.state.lock_ignore_poison();
            if !state.path.truncate_to(index) {
                return Err(SessionError::NoSuchCrumb(index));
            }
            state.search = None;
        }
        self.load().await
    }

    pub async fn set_search(
        &self,
        text: Option<String>,
        scope: SearchScope,
    ) -> Result<LoadOutcome, SessionError> {
        {
            let mut state = self.inner.state.lock_ignore_poison();
            state.search = text.filter(|text| !text.trim().is_empty());
            state.search_scope = scope;
        }
        self.load().await
    }

    pub async fn set_time_range(&self, range: TimeRange) -> Result<LoadOutcome, SessionError> {
        self.inner
            .state
            .lock_ignore_poison()
            .select_time_range(range);
        self.load().await
    }

    pub async fn set_item_cap(&self, cap: ItemCap) -> Result<LoadOutcome, SessionError> {
        self.inner.state.lock_ignore_poison().item_cap = cap;
        self.load().await
    }

    /// Drops cached counts, re-anchors the time bound at now and reloads.
    pub async fn refresh(&self) -> Result<LoadOutcome, SessionError> {
        self.cancel_enrichment();
        {
            let mut state = self.inner.state.lock_ignore_poison();
            let range = state.time_range;
            state.select_time_range(range);
            self.inner.stats.lock_ignore_poison().clear();
        }
        self.load().await
    }

    pub async fn reset_root(
        &self,
        root_id: impl Into<String>,
        root_name: impl Into<String>,
    ) -> Result<LoadOutcome, SessionError> {
        self.cancel_enrichment();
        {
            let mut state = self.inner.state.lock_ignore_poison();
            state.path = NavigationPath::new(root_id, root_name);
            state.search = None;
            state.entries.clear();
            self.inner.stats.lock_ignore_poison().clear();
        }
        self.load().await
    }

    pub fn cancel(&self) {
        self.inner.guard.cancel_active();
        self.cancel_enrichment();
    }

    pub async fn load(&self) -> Result<LoadOutcome, SessionError> {
        let inner = &self.inner;
        let ticket = inner.guard.begin();
        self.cancel_enrichment();

        let (query, cap, container_id) = {
            let mut state = inner.state.lock_ignore_poison();
            state.entries.clear();
            state.status = LoadStatus::Loading;
            state.last_error = None;
            state.wider_range_entries = None;
            (
                state.active_query(),
                state.item_cap,
                state.path.current().id.clone(),
            )
        };
        self.emit(SessionEvent::LoadStarted {
            generation: ticket.generation(),
            container_id,
        });

        let mut stream = PageStream::new(inner.client.clone(), query, cap)
            .with_page_delay(inner.options.page_delay);
        let mut first = match stream.next_batch().await {
            Ok(batch) => batch.unwrap_or_default(),
            Err(err) => return self.fail(&ticket, err),
        };
        if !ticket.is_current() {
            return Ok(LoadOutcome::Superseded);
        }

        let mut widened = false;
        let mut wider_range_entries = None;
        if let Fallback::Widened {
            first: wider,
            stream: wider_stream,
        } = fallback::widen_if_empty(&stream, first.len()).await
        {
            match inner.options.fallback {
                FallbackMode::Adopt => {
                    first = wider;
                    stream = wider_stream;
                    widened = true;
                }
                FallbackMode::Suggest => wider_range_entries = Some(wider.len()),
            }
        }

        {
            let mut state = inner.state.lock_ignore_poison();
            if !ticket.is_current() {
                return Ok(LoadOutcome::Superseded);
            }
            if widened {
                info!("showing unbounded listing; time range reset to all");
                state.time_range = TimeRange::All;
                state.modified_since = None;
                self.emit(SessionEvent::TimeRangeWidened {
                    generation: ticket.generation(),
                });
            }
            if let Some(entries) = wider_range_entries {
                self.emit(SessionEvent::WiderRangeAvailable {
                    generation: ticket.generation(),
                    entries,
                });
            }
            state.wider_range_entries = wider_range_entries;
            state.entries = first.clone();
            state.status = if stream.is_finished() {
                LoadStatus::Idle
            } else {
                LoadStatus::FetchingMore
            };
            self.emit(SessionEvent::Batch {
                generation: ticket.generation(),
                entries: first,
            });
        }

        loop {
            let batch = match stream.next_batch().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(err) => return self.fail(&ticket, err),
            };
            let mut state = inner.state.lock_ignore_poison();
            if !ticket.is_current() {
                return Ok(LoadOutcome::Superseded);
            }
            state.entries.extend(batch.iter().cloned());
            self.emit(SessionEvent::Batch {
                generation: ticket.generation(),
                entries: batch,
            });
        }

        let mut state = inner.state.lock_ignore_poison();
        if !ticket.is_current() {
            return Ok(LoadOutcome::Superseded);
        }
        state.status = LoadStatus::Idle;
        let total = state.entries.len();
        self.emit(SessionEvent::LoadFinished {
            generation: ticket.generation(),
            total,
        });
        Ok(LoadOutcome::Completed {
            entries: total,
            widened,
        })
    }

    fn fail(&self, ticket: &LoadTicket, err: DriveError) -> Result<LoadOutcome, SessionError> {
        let mut state = self.inner.state.lock_ignore_poison();
        if !ticket.is_current() {
            return Ok(LoadOutcome::Superseded);
        }
        warn!("load {} failed: {err}", ticket.generation());
        let failure = LoadFailure {
            kind: err.kind(),
            message: err.to_string(),
        };
        state.status = LoadStatus::Failed(failure.kind);
        state.last_error = Some(failure.clone());
        self.emit(SessionEvent::LoadFailed {
            generation: ticket.generation(),
            kind: failure.kind,
            message: failure.message,
        });
        Err(err.into())
    }

    pub async fn enrich_visible(&self, filter: Option<&str>) -> EnrichmentOutcome {
        let liveness = CancellationToken::new();
        std::mem::replace(
            &mut *self.inner.enrichment.lock_ignore_poison(),
            liveness.clone(),
        )
        .cancel();

        let folders = {
            let state = self.inner.state.lock_ignore_poison();
            let stats = self.inner.stats.lock_ignore_poison();
            pending_folders(state.visible(filter), &stats)
        };
        let client = self.inner.client.clone();
        self.inner
            .options
            .scheduler
            .run(
                folders,
                &self.inner.stats,
                &liveness,
                |id| {
                    let client = client.clone();
                    async move { client.fetch_child_folder_count(&id).await }
                },
                |counts| {
                    self.emit(SessionEvent::StatsMerged {
                        counts: counts.to_vec(),
                    })
                },
            )
            .await
    }

    fn cancel_enrichment(&self) {
        self.inner.enrichment.lock_ignore_poison().cancel();
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
