//! What the user currently wants to see: search, filters, sort and page.

use serde::{Deserialize, Serialize};

/// Column the current page can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Type,
    Severity,
    Priority,
    Status,
    Title,
    Id,
    Modified,
}

impl SortKey {
    /// Field name the server sorts by in `sort_by` parameters.
    pub fn api_field(self) -> &'static str {
        match self {
            SortKey::Type => "issue_type",
            SortKey::Severity => "severity",
            SortKey::Priority => "priority",
            SortKey::Status => "status",
            SortKey::Title => "title",
            SortKey::Id => "id",
            SortKey::Modified => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// One of the server-side filter dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Status,
    Priority,
    Assignee,
    Creator,
}

impl FilterKey {
    /// Query parameter name understood by `GET /issues/`.
    pub fn param(self) -> &'static str {
        match self {
            FilterKey::Status => "status",
            FilterKey::Priority => "priority",
            FilterKey::Assignee => "assignee_id",
            FilterKey::Creator => "creator_id",
        }
    }
}

/// Filter constraints; `None` means "no constraint".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueFilters {
    pub status: Option<i64>,
    pub priority: Option<i64>,
    pub assignee: Option<i64>,
    pub creator: Option<i64>,
}

impl IssueFilters {
    pub fn get(&self, key: FilterKey) -> Option<i64> {
        match key {
            FilterKey::Status => self.status,
            FilterKey::Priority => self.priority,
            FilterKey::Assignee => self.assignee,
            FilterKey::Creator => self.creator,
        }
    }

    pub fn set(&mut self, key: FilterKey, value: Option<i64>) {
        let slot = match key {
            FilterKey::Status => &mut self.status,
            FilterKey::Priority => &mut self.priority,
            FilterKey::Assignee => &mut self.assignee,
            FilterKey::Creator => &mut self.creator,
        };
        *slot = value;
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Full description of the requested slice of the issue collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntent {
    pub search_term: String,
    pub filters: IssueFilters,
    pub sort_key: Option<SortKey>,
    pub sort_direction: SortDirection,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl QueryIntent {
    pub fn new(page_size: u32) -> Self {
        Self {
            search_term: String::new(),
            filters: IssueFilters::default(),
            sort_key: None,
            sort_direction: SortDirection::Ascending,
            page: 1,
            page_size,
        }
    }

    /// Ordered query parameters for `GET /issues/`.
    ///
    /// Blank search terms and unset filters are left out; `page` and
    /// `page_size` are always present.
    pub fn build_request_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        let term = self.search_term.trim();
        if !term.is_empty() {
            params.push(("q".to_string(), term.to_string()));
        }

        for key in [
            FilterKey::Status,
            FilterKey::Priority,
            FilterKey::Assignee,
            FilterKey::Creator,
        ] {
            if let Some(id) = self.filters.get(key) {
                params.push((key.param().to_string(), id.to_string()));
            }
        }

        params.push(("page".to_string(), self.page.to_string()));
        params.push(("page_size".to_string(), self.page_size.to_string()));
        params
    }
}
