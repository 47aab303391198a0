use thiserror_no_std::Error;

/// Error manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NjangError {
    /// The examples, labels or points handed to a model are unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model was used before being trained.
    #[error("{model} is not fitted yet")]
    NotFitted { model: &'static str },
}

impl NjangError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}
