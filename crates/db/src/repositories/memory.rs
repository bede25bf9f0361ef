use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use outlay_core::domain::budget::{BudgetTier, BudgetTierId};
use outlay_core::domain::decision::ApprovalEvent;
use outlay_core::domain::employee::{Employee, EmployeeId};
use outlay_core::domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus};

use super::{
    ApprovalEventRepository, BudgetTierRepository, EmployeeRepository, ExpenseRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<String, Employee>>,
}

impl InMemoryEmployeeRepository {
    pub async fn with_employees(employees: Vec<Employee>) -> Self {
        let repo = Self::default();
        for employee in employees {
            let _ = repo.save(employee).await;
        }
        repo
    }
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        let mut all: Vec<Employee> = employees.values().cloned().collect();
        all.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(all)
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id.0.clone(), employee);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBudgetTierRepository {
    tiers: RwLock<HashMap<String, BudgetTier>>,
}

impl InMemoryBudgetTierRepository {
    pub async fn with_tiers(tiers: Vec<BudgetTier>) -> Self {
        let repo = Self::default();
        for tier in tiers {
            let _ = repo.save(tier).await;
        }
        repo
    }
}

#[async_trait::async_trait]
impl BudgetTierRepository for InMemoryBudgetTierRepository {
    async fn list_active(&self) -> Result<Vec<BudgetTier>, RepositoryError> {
        let tiers = self.tiers.read().await;
        let mut active: Vec<BudgetTier> =
            tiers.values().filter(|tier| tier.is_active).cloned().collect();
        active.sort_by(|left, right| {
            left.min_amount.cmp(&right.min_amount).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(active)
    }

    async fn find_for_amount(
        &self,
        amount: Decimal,
    ) -> Result<Option<BudgetTier>, RepositoryError> {
        Ok(self.list_active().await?.into_iter().find(|tier| tier.contains(amount)))
    }

    async fn save(&self, tier: BudgetTier) -> Result<(), RepositoryError> {
        let mut tiers = self.tiers.write().await;
        tiers.insert(tier.id.0.clone(), tier);
        Ok(())
    }

    async fn deactivate(&self, id: &BudgetTierId) -> Result<(), RepositoryError> {
        let mut tiers = self.tiers.write().await;
        if let Some(tier) = tiers.get_mut(&id.0) {
            tier.is_active = false;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryExpenseRepository {
    expenses: RwLock<HashMap<String, ExpenseRequest>>,
}

#[async_trait::async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    async fn find_by_id(
        &self,
        id: &ExpenseId,
    ) -> Result<Option<ExpenseRequest>, RepositoryError> {
        let expenses = self.expenses.read().await;
        Ok(expenses.get(&id.0).cloned())
    }

    async fn save(&self, expense: ExpenseRequest) -> Result<(), RepositoryError> {
        let mut expenses = self.expenses.write().await;
        expenses.insert(expense.id.0.clone(), expense);
        Ok(())
    }

    async fn list_for_submitter(
        &self,
        submitter: &EmployeeId,
    ) -> Result<Vec<ExpenseRequest>, RepositoryError> {
        let expenses = self.expenses.read().await;
        let mut mine: Vec<ExpenseRequest> =
            expenses.values().filter(|expense| expense.submitted_by == *submitter).cloned().collect();
        mine.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(mine)
    }

    async fn list_pending_for_approver(
        &self,
        approver: &EmployeeId,
    ) -> Result<Vec<ExpenseRequest>, RepositoryError> {
        let expenses = self.expenses.read().await;
        let mut inbox: Vec<ExpenseRequest> = expenses
            .values()
            .filter(|expense| {
                expense.status == ExpenseStatus::Pending
                    && expense.current_approver.as_ref() == Some(approver)
            })
            .cloned()
            .collect();
        inbox.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(inbox)
    }
}

#[derive(Default)]
pub struct InMemoryApprovalEventRepository {
    events: RwLock<Vec<ApprovalEvent>>,
}

#[async_trait::async_trait]
impl ApprovalEventRepository for InMemoryApprovalEventRepository {
    async fn append(&self, event: ApprovalEvent) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }

    async fn list_for_expense(
        &self,
        expense_id: &ExpenseId,
    ) -> Result<Vec<ApprovalEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| event.expense_id == *expense_id).cloned().collect())
    }
}
