use std::time::Duration;

use anyhow::Context;
use drivelist_core::DEFAULT_BASE_URL;

use crate::session::SessionOptions;
use crate::sync::enrichment::{DEFAULT_BATCH_PAUSE, DEFAULT_BATCH_SIZE, EnrichmentScheduler};
use crate::sync::fallback::FallbackMode;
use crate::sync::pagination::DEFAULT_PAGE_DELAY;
use crate::sync::time_range::{ItemCap, TimeRange};

const DEFAULT_ROOT_NAME: &str = "Root";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub root_id: String,
    pub root_name: String,
    pub time_range: TimeRange,
    pub item_cap: ItemCap,
    pub page_delay: Duration,
    pub stats_batch_size: usize,
    pub stats_batch_pause: Duration,
    pub fallback: FallbackMode,
}

impl SessionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let root_id = std::env::var("DRIVE_ROOT_ID")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .context("DRIVE_ROOT_ID is not set")?;
        let root_name =
            std::env::var("DRIVE_ROOT_NAME").unwrap_or_else(|_| DEFAULT_ROOT_NAME.to_string());
        let api_key = std::env::var("DRIVE_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let base_url =
            std::env::var("DRIVE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let time_range = read_parsed_env("DRIVE_TIME_RANGE", TimeRange::default());
        let item_cap = read_parsed_env("DRIVE_ITEM_LIMIT", ItemCap::default());
        let page_delay = Duration::from_millis(read_u64_env(
            "DRIVE_PAGE_DELAY_MS",
            DEFAULT_PAGE_DELAY.as_millis() as u64,
        ));
        let stats_batch_size =
            read_u64_env("DRIVE_STATS_BATCH_SIZE", DEFAULT_BATCH_SIZE as u64) as usize;
        let stats_batch_pause = Duration::from_millis(read_u64_env(
            "DRIVE_STATS_BATCH_PAUSE_MS",
            DEFAULT_BATCH_PAUSE.as_millis() as u64,
        ));
        let fallback = read_parsed_env("DRIVE_FALLBACK_MODE", FallbackMode::default());

        Ok(Self {
            api_key,
            base_url,
            root_id,
            root_name,
            time_range,
            item_cap,
            page_delay,
            stats_batch_size,
            stats_batch_pause,
            fallback,
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            time_range: self.time_range,
            item_cap: self.item_cap,
            page_delay: self.page_delay,
            scheduler: EnrichmentScheduler::new(self.stats_batch_size, self.stats_batch_pause),
            fallback: self.fallback,
        }
    }
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_parsed_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
