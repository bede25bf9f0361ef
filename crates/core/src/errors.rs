use thiserror::Error;

use crate::domain::expense::{ExpenseId, ExpenseStatus};
use crate::workflow::WorkflowError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid expense transition from {from:?} to {to:?}")]
    InvalidExpenseTransition { from: ExpenseStatus, to: ExpenseStatus },
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("expense request not found: {0}")]
    ExpenseNotFound(ExpenseId),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Routing gaps degrade silently inside the resolver; a missing expense
    /// does not. Callers use this split to decide what reaches the user.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::ExpenseNotFound(_))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => "The decision could not be applied to this request.",
            Self::ExpenseNotFound(_) => "The expense request could not be found.",
            Self::Persistence(_) => "The service is temporarily unavailable. Please retry shortly.",
            Self::Configuration(_) => "An unexpected internal error occurred.",
        }
    }
}
