use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseId(pub String);

impl std::fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub id: ExpenseId,
    pub title: String,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub business_justification: String,
    pub status: ExpenseStatus,
    pub urgency: Urgency,
    pub submitted_by: EmployeeId,
    /// Set only while the request is pending and the chain is not exhausted.
    pub current_approver: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpenseRequest {
    pub fn can_transition_to(&self, next: ExpenseStatus) -> bool {
        matches!(
            (self.status, next),
            (ExpenseStatus::Pending, ExpenseStatus::Approved)
                | (ExpenseStatus::Pending, ExpenseStatus::Rejected)
        )
    }

    /// Terminal transitions clear the current approver; terminal states are
    /// absorbing and reject any further transition.
    pub fn transition_to(&mut self, next: ExpenseStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidExpenseTransition { from: self.status, to: next });
        }

        self.status = next;
        if next.is_terminal() {
            self.current_approver = None;
        }
        Ok(())
    }

    pub fn reassign_approver(&mut self, approver: EmployeeId) {
        self.current_approver = Some(approver);
    }
}
