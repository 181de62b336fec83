//! Bulk issue entry: one title per line.

use thiserror::Error;
use ventus_services::CreateIssueRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkParseError {
    #[error("Enter at least one issue title")]
    Empty,
}

/// Split on newlines, trim each line and drop the blank ones.
pub fn parse_bulk_titles(input: &str) -> Result<Vec<String>, BulkParseError> {
    let titles: Vec<String> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if titles.is_empty() {
        return Err(BulkParseError::Empty);
    }
    Ok(titles)
}

pub fn to_requests(titles: Vec<String>) -> Vec<CreateIssueRequest> {
    titles.into_iter().map(CreateIssueRequest::titled).collect()
}
