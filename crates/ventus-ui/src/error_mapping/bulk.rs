use crate::models::bulk::BulkParseError;
use ventus_core::{AppError, IssueError};

impl From<BulkParseError> for AppError {
    fn from(e: BulkParseError) -> Self {
        AppError::Issue(IssueError::Validation(e.to_string()))
    }
}
