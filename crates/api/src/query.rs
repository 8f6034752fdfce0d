//! Shared query parameter types for API handlers.

use serde::Deserialize;

use aquadash_core::telemetry::TimeRange;
use aquadash_core::types::EpochMillis;
use aquadash_platform::models::{PageLink, DEFAULT_PAGE_SIZE};

/// Registry paging (`?page_size=&page=`), forwarded to the platform.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

impl PageParams {
    pub fn page_link(&self) -> PageLink {
        PageLink {
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            page: self.page.unwrap_or(0),
        }
    }
}

/// Time range (`?start_ts=&end_ts=&limit=`), epoch milliseconds.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start_ts: Option<EpochMillis>,
    pub end_ts: Option<EpochMillis>,
    pub limit: Option<u32>,
}

impl RangeParams {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            limit: self.limit,
        }
    }
}
