use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use drivelist_core::{DirectoryEntry, FolderCount};
use futures_util::future::join_all;
use log::debug;
use tokio_util::sync::CancellationToken;

use super::stats_cache::StatsCache;
use crate::ignore_poison::IgnorePoison;

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentScheduler {
    batch_size: usize,
    batch_pause: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Completed { batches: usize, folders: usize },
    Cancelled { merged_batches: usize },
}

impl Default for EnrichmentScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_BATCH_PAUSE)
    }
}

impl EnrichmentScheduler {
    pub fn new(batch_size: usize, batch_pause: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_pause,
        }
    }

    pub async fn run<F, Fut, M>(
        &self,
        folders: Vec<String>,
        cache: &Mutex<StatsCache>,
        liveness: &CancellationToken,
        fetch: F,
        mut on_merge: M,
    ) -> EnrichmentOutcome
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = FolderCount>,
        M: FnMut(&[(String, FolderCount)]),
    {
        let mut merged_batches = 0;
        for (index, batch) in folders.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_pause).await;
            }
            if liveness.is_cancelled() {
                return EnrichmentOutcome::Cancelled { merged_batches };
            }

            let results: Vec<(String, FolderCount)> =
                join_all(batch.iter().map(|id| {
                    let count = fetch(id.clone());
                    async move { (id.clone(), count.await) }
                }))
                .await;

            {
                let mut cache = cache.lock_ignore_poison();
                if liveness.is_cancelled() {
                    return EnrichmentOutcome::Cancelled { merged_batches };
                }
                cache.merge(results.iter().cloned());
            }
            merged_batches += 1;
            debug!(
                "merged child counts for batch {} ({} folders)",
                merged_batches,
                results.len()
            );
            on_merge(&results);
        }
        EnrichmentOutcome::Completed {
            batches: merged_batches,
            folders: folders.len(),
        }
    }
}

pub fn pending_folders<'a, I>(entries: I, cache: &StatsCache) -> Vec<String>
where
    I: IntoIterator<Item = &'a DirectoryEntry>,
{
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| entry.is_folder() && !cache.contains(&entry.id))
        .filter(|entry| seen.insert(entry.id.as_str()))
        .map(|entry| entry.id.clone())
        .collect()
}
