use std::fmt;

/// Errors surfaced by the analytics engine and the query coordinator.
///
/// Zero matching records is not an error; it is an empty `PageResult`.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The upstream provider failed or returned data that breaks its contract.
    ProviderUnavailable {
        provider: &'static str,
        stage: &'static str,
        detail: String,
    },
    /// Rejected before any fetch or computation was attempted.
    InvalidInput { field: &'static str, detail: String },
}

impl CoreError {
    pub fn invalid(field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            detail: detail.into(),
        }
    }

    pub fn provider(provider: &'static str, stage: &'static str, err: &anyhow::Error) -> Self {
        Self::ProviderUnavailable {
            provider,
            stage,
            detail: format!("{err:#}"),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable {
                provider,
                stage,
                detail,
            } => write!(
                f,
                "provider unavailable (provider={provider}, stage={stage}): {detail}"
            ),
            Self::InvalidInput { field, detail } => {
                write!(f, "invalid input ({field}): {detail}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
