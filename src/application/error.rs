use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{
        pagination::PaginationError, repos::RepoError, status_filter::FilterError,
        timeline::TimelineError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

/// An error flattened into its message chain, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }

    /// Process exit code: 2 for bad input, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::NotFound { .. } | DomainError::Malformed { .. })
            | AppError::NotFound
            | AppError::Validation(_) => 2,
            AppError::Domain(DomainError::Invariant { .. })
            | AppError::Infra(_)
            | AppError::Timeline(_)
            | AppError::Unexpected(_) => 1,
        }
    }
}

impl From<PaginationError> for AppError {
    fn from(err: PaginationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound,
            other => AppError::Timeline(TimelineError::Repo(other)),
        }
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::Timeline(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_the_source_chain() {
        let err = AppError::from(TimelineError::Repo(RepoError::Timeout));
        let report = err.report();
        assert_eq!(report.messages[0], "storage timeout");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn bad_input_exits_with_two() {
        let err = AppError::from(PaginationError::InvalidLimit("x".to_string()));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(AppError::from(RepoError::NotFound).exit_code(), 2);
    }
}
