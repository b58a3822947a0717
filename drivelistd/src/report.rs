use std::collections::BTreeMap;

use drivelist_core::DirectoryEntry;
use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};

use crate::sync::time_range::TimeRange;

const MAX_CHARTED_DAYS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub day: String,
    pub new_folders: usize,
    pub updated_folders: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityReport {
    pub new_folders: usize,
    pub updated_folders: usize,
    pub total_size: u64,
    pub image_files: usize,
    pub video_files: usize,
    pub other_files: usize,
    pub daily: Vec<DailyActivity>,
}

#[derive(Default)]
struct DayTally {
    new_folders: usize,
    updated_folders: usize,
}

impl ActivityReport {
    pub fn build(entries: &[DirectoryEntry], range: TimeRange, now: OffsetDateTime) -> Self {
        let window_start = match range.days() {
            Some(days) => (now - Duration::days(i64::from(days)))
                .date()
                .midnight()
                .assume_utc(),
            None => OffsetDateTime::UNIX_EPOCH,
        };

        let mut days: BTreeMap<Date, DayTally> = BTreeMap::new();
        if let Some(count) = range.days() {
            for offset in 0..i64::from(count) {
                days.insert((now - Duration::days(offset)).date(), DayTally::default());
            }
        }

        let mut report = ActivityReport::default();
        for entry in entries
            .iter()
            .filter(|entry| entry.last_modified >= window_start)
        {
            report.total_size += entry.size_bytes().unwrap_or(0);
            if !entry.is_folder() {
                match entry.content_type() {
                    Some(mime) if mime.starts_with("image/") => report.image_files += 1,
                    Some(mime) if mime.starts_with("video/") => report.video_files += 1,
                    _ => report.other_files += 1,
                }
                continue;
            }

            let created = entry.created_at.unwrap_or(entry.last_modified);
            let is_new = created >= window_start;
            if is_new {
                report.new_folders += 1;
            } else {
                report.updated_folders += 1;
            }

            let day = entry.last_modified.date();
            let tally = match range {
                TimeRange::All => Some(days.entry(day).or_default()),
                TimeRange::Days(_) => days.get_mut(&day),
            };
            if let Some(tally) = tally {
                if is_new {
                    tally.new_folders += 1;
                } else {
                    tally.updated_folders += 1;
                }
            }
        }

        let mut daily: Vec<DailyActivity> = days
            .into_iter()
            .map(|(day, tally)| DailyActivity {
                day: day.to_string(),
                new_folders: tally.new_folders,
                updated_folders: tally.updated_folders,
                total: tally.new_folders + tally.updated_folders,
            })
            .collect();
        if matches!(range, TimeRange::All | TimeRange::Days(90)) {
            daily.retain(|day| day.total > 0);
            let excess = daily.len().saturating_sub(MAX_CHARTED_DAYS);
            daily.drain(..excess);
        }
        report.daily = daily;
        report
    }
}
