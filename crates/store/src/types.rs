//! Read-surface shapes shared by every list/pagination query.

use chrono::{DateTime, Utc};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Pagination + sort request. `normalize` applies the boundary rules from
/// spec §8: `pageSize > 1000` clamps to the default, `pageSize <= 0` uses
/// the default, page is floored at 1.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub sort_order: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE, sort_order: SortOrder::Asc }
    }
}

impl Pagination {
    pub fn normalize(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total_count: u64) -> Self {
        let total_pages = if pagination.page_size == 0 {
            0
        } else {
            (total_count + pagination.page_size as u64 - 1) / pagination.page_size as u64
        };
        Self {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total_count,
            total_pages,
        }
    }
}

/// Free-text + multi-value filters for the images list surface.
#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    pub search: Option<String>,
    pub namespaces: Vec<String>,
    pub vuln_statuses: Vec<String>,
    pub package_types: Vec<String>,
    pub os_names: Vec<String>,
}

/// Which timestamp column `LastUpdatedTimestamp` reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastUpdatedKind {
    Image,
    Instance,
    Vulnerability,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobRun {
    pub id: i64,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<String>,
    pub error: Option<String>,
}

/// Result of `ExecuteReadOnlyQuery`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DebugQueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
