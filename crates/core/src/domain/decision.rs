use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::employee::EmployeeId;
use crate::domain::expense::ExpenseId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalEventId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

/// One recorded decision in a request's append-only history. Events are never
/// mutated or deleted; duplicates from the same approver are legal and each
/// append lands as its own row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub id: ApprovalEventId,
    pub expense_id: ExpenseId,
    pub approver_id: EmployeeId,
    pub decision: Decision,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalEvent {
    pub fn record(
        expense_id: ExpenseId,
        approver_id: EmployeeId,
        decision: Decision,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: ApprovalEventId(Uuid::new_v4().to_string()),
            expense_id,
            approver_id,
            decision,
            comment,
            created_at: Utc::now(),
        }
    }

    pub fn is_approval(&self) -> bool {
        self.decision == Decision::Approved
    }
}
