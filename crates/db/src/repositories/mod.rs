use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use outlay_core::domain::budget::{BudgetTier, BudgetTierId};
use outlay_core::domain::decision::ApprovalEvent;
use outlay_core::domain::employee::{Employee, EmployeeId};
use outlay_core::domain::expense::{ExpenseId, ExpenseRequest};

pub mod approval_event;
pub mod budget;
pub mod employee;
pub mod expense;
pub mod memory;

pub use approval_event::SqlApprovalEventRepository;
pub use budget::SqlBudgetTierRepository;
pub use employee::SqlEmployeeRepository;
pub use expense::SqlExpenseRepository;
pub use memory::{
    InMemoryApprovalEventRepository, InMemoryBudgetTierRepository, InMemoryEmployeeRepository,
    InMemoryExpenseRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only directory access. The routing core never queries this directly;
/// the workflow service materializes an `OrgDirectory` snapshot from
/// `list_all` before resolving.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn save(&self, employee: Employee) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BudgetTierRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<BudgetTier>, RepositoryError>;
    async fn find_for_amount(&self, amount: Decimal)
        -> Result<Option<BudgetTier>, RepositoryError>;
    async fn save(&self, tier: BudgetTier) -> Result<(), RepositoryError>;
    /// Soft delete: tiers are deactivated, never removed.
    async fn deactivate(&self, id: &BudgetTierId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn find_by_id(&self, id: &ExpenseId)
        -> Result<Option<ExpenseRequest>, RepositoryError>;
    async fn save(&self, expense: ExpenseRequest) -> Result<(), RepositoryError>;
    async fn list_for_submitter(
        &self,
        submitter: &EmployeeId,
    ) -> Result<Vec<ExpenseRequest>, RepositoryError>;
    async fn list_pending_for_approver(
        &self,
        approver: &EmployeeId,
    ) -> Result<Vec<ExpenseRequest>, RepositoryError>;
}

/// Append-only decision log. There is deliberately no update or delete.
#[async_trait]
pub trait ApprovalEventRepository: Send + Sync {
    async fn append(&self, event: ApprovalEvent) -> Result<(), RepositoryError>;
    async fn list_for_expense(
        &self,
        expense_id: &ExpenseId,
    ) -> Result<Vec<ApprovalEvent>, RepositoryError>;
}
