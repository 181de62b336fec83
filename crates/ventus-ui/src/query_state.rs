//! Search / filter / sort / page state for the issue list.
//!
//! Pure state: no I/O, no timers. The list model decides when to fetch.

use ventus_services::{FilterKey, IssueFilters, QueryIntent, SortDirection, SortKey};

#[derive(Debug, Clone)]
pub struct QueryState {
    intent: QueryIntent,
    /// Total reported by the last successful fetch; `None` before the first.
    total_count: Option<u64>,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            intent: QueryIntent::new(page_size.max(1)),
            total_count: None,
        }
    }

    pub fn intent(&self) -> &QueryIntent {
        &self.intent
    }

    pub fn page(&self) -> u32 {
        self.intent.page
    }

    pub fn page_size(&self) -> u32 {
        self.intent.page_size
    }

    pub fn search_term(&self) -> &str {
        &self.intent.search_term
    }

    pub fn filters(&self) -> &IssueFilters {
        &self.intent.filters
    }

    pub fn sort_key(&self) -> Option<SortKey> {
        self.intent.sort_key
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.intent.sort_direction
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn set_total_count(&mut self, total: u64) {
        self.total_count = Some(total);
    }

    /// Number of pages for the known total; at least 1.
    pub fn total_pages(&self) -> u32 {
        match self.total_count {
            Some(total) if total > 0 => {
                let size = u64::from(self.intent.page_size);
                total.div_ceil(size).min(u64::from(u32::MAX)) as u32
            }
            _ => 1,
        }
    }

    /// New search term; always back to page 1.
    pub fn set_search_term(&mut self, term: &str) -> QueryIntent {
        self.intent.search_term = term.trim().to_string();
        self.intent.page = 1;
        self.intent.clone()
    }

    /// Set or clear one filter; always back to page 1.
    pub fn set_filter(&mut self, key: FilterKey, value: Option<i64>) -> QueryIntent {
        self.intent.filters.set(key, value);
        self.intent.page = 1;
        self.intent.clone()
    }

    /// Same key flips the direction, a new key sorts ascending. The page is
    /// left alone.
    pub fn set_sort(&mut self, key: SortKey) -> QueryIntent {
        if self.intent.sort_key == Some(key) {
            self.intent.sort_direction = self.intent.sort_direction.flipped();
        } else {
            self.intent.sort_key = Some(key);
            self.intent.sort_direction = SortDirection::Ascending;
        }
        self.intent.clone()
    }

    /// Move to page `n`. Returns `false` and changes nothing when `n` is 0
    /// or lies past the last page of a known, non-empty total.
    pub fn set_page(&mut self, n: u32) -> bool {
        if n < 1 {
            return false;
        }
        if let Some(total) = self.total_count {
            let first_index = u64::from(n - 1) * u64::from(self.intent.page_size);
            if total > 0 && first_index >= total {
                return false;
            }
        }
        self.intent.page = n;
        true
    }

    /// Go back to page 1. Returns whether the page changed.
    pub fn first_page(&mut self) -> bool {
        let moved = self.intent.page != 1;
        self.intent.page = 1;
        moved
    }

    /// Step back one page after the current one emptied. No-op on page 1.
    pub fn step_back(&mut self) -> bool {
        if self.intent.page > 1 {
            self.intent.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn build_request_params(&self) -> Vec<(String, String)> {
        self.intent.build_request_params()
    }
}
