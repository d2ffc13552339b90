use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::watch::WatchError, config::LoadError, domain::error::DomainError,
    infra::error::InfraError,
};

/// Flattened error chain, outermost message first.
#[derive(Debug, Clone, PartialEq, Eq)]
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
    Config(#[from] LoadError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("render failed: {0}")]
    Render(String),
}

impl AppError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Process exit status for the CLI: 2 for bad input or configuration,
    /// 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Config(_)
            | AppError::Watch(WatchError::InvalidInterval { .. }) => 2,
            AppError::Infra(InfraError::Io(_))
            | AppError::Infra(InfraError::Telemetry(_))
            | AppError::Watch(_)
            | AppError::Render(_) => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
