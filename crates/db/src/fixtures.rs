use chrono::Utc;
use rust_decimal::Decimal;

use outlay_core::domain::budget::{BudgetTier, BudgetTierId};
use outlay_core::domain::decision::{ApprovalEvent, ApprovalEventId, Decision};
use outlay_core::domain::employee::{Employee, EmployeeId, Role};
use outlay_core::domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus, Urgency};

use crate::repositories::{
    ApprovalEventRepository, BudgetTierRepository, EmployeeRepository, ExpenseRepository,
    RepositoryError, SqlApprovalEventRepository, SqlBudgetTierRepository, SqlEmployeeRepository,
    SqlExpenseRepository,
};
use crate::DbPool;

/// Deterministic demo dataset: a small org tree, three non-overlapping budget
/// tiers, and two expense requests (one mid-flight, one already approved).
/// Fixed ids make reloading idempotent.
pub struct DemoDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub employees: usize,
    pub budget_tiers: usize,
    pub expenses: usize,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

const SEED_PENDING_EXPENSE: &str = "seed-exp-pending";
const SEED_APPROVED_EXPENSE: &str = "seed-exp-approved";
const SEED_APPROVED_EVENT: &str = "seed-evt-approved";

fn seed_employees() -> Vec<Employee> {
    let now = Utc::now();
    let make = |id: &str, name: &str, role, level, manager: Option<&str>, position: &str| Employee {
        id: EmployeeId(id.to_string()),
        name: name.to_string(),
        email: format!("{id}@outlay.test"),
        role,
        level,
        manager_id: manager.map(|m| EmployeeId(m.to_string())),
        position: Some(position.to_string()),
        department: Some("Operations".to_string()),
        created_at: now,
        updated_at: now,
    };

    vec![
        make("seed-ceo", "Morgan Hale", Role::Standard, 1, None, "Chief Executive"),
        make("seed-vp-finance", "Priya Natarajan", Role::Standard, 2, Some("seed-ceo"), "VP Finance"),
        make("seed-vp-eng", "Tomas Lindqvist", Role::Standard, 2, Some("seed-ceo"), "VP Engineering"),
        make(
            "seed-mgr-platform",
            "Ada Okafor",
            Role::Standard,
            3,
            Some("seed-vp-eng"),
            "Platform Manager",
        ),
        make(
            "seed-staff-dev",
            "Jonah Weiss",
            Role::Standard,
            4,
            Some("seed-mgr-platform"),
            "Engineer",
        ),
        make(
            "seed-staff-analyst",
            "Lucia Romero",
            Role::Standard,
            4,
            Some("seed-mgr-platform"),
            "Analyst",
        ),
        make("seed-it-admin", "Sam Kovacs", Role::Admin, 1, None, "System Administrator"),
    ]
}

fn seed_tiers() -> Vec<BudgetTier> {
    let now = Utc::now();
    let make = |id: &str, name: &str, min: i64, max: i64, levels: &[u8], description: &str| {
        BudgetTier {
            id: BudgetTierId(id.to_string()),
            name: name.to_string(),
            min_amount: Decimal::new(min, 2),
            max_amount: Decimal::new(max, 2),
            approver_levels: levels.to_vec(),
            description: Some(description.to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    };

    vec![
        make("seed-tier-petty", "Petty cash", 0, 50_000, &[3], "Manager sign-off only"),
        make(
            "seed-tier-standard",
            "Standard spend",
            50_001,
            500_000,
            &[3, 2],
            "Manager then VP",
        ),
        make(
            "seed-tier-major",
            "Major spend",
            500_001,
            5_000_000,
            &[3, 2, 1],
            "Full chain up to the executive level",
        ),
    ]
}

fn seed_expenses() -> Vec<ExpenseRequest> {
    let now = Utc::now();
    vec![
        ExpenseRequest {
            id: ExpenseId(SEED_PENDING_EXPENSE.to_string()),
            title: "Observability platform licenses".to_string(),
            amount: Decimal::new(240_000, 2),
            category: "software".to_string(),
            description: "Annual licenses for the tracing stack".to_string(),
            business_justification: "Current contract expires next month".to_string(),
            status: ExpenseStatus::Pending,
            urgency: Urgency::High,
            submitted_by: EmployeeId("seed-staff-dev".to_string()),
            current_approver: Some(EmployeeId("seed-mgr-platform".to_string())),
            created_at: now,
            updated_at: now,
        },
        ExpenseRequest {
            id: ExpenseId(SEED_APPROVED_EXPENSE.to_string()),
            title: "Whiteboard restock".to_string(),
            amount: Decimal::new(8_500, 2),
            category: "office".to_string(),
            description: "Markers and erasers for the team rooms".to_string(),
            business_justification: "Supplies depleted".to_string(),
            status: ExpenseStatus::Approved,
            urgency: Urgency::Low,
            submitted_by: EmployeeId("seed-staff-analyst".to_string()),
            current_approver: None,
            created_at: now,
            updated_at: now,
        },
    ]
}

impl DemoDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let employees = SqlEmployeeRepository::new(pool.clone());
        let tiers = SqlBudgetTierRepository::new(pool.clone());
        let expenses = SqlExpenseRepository::new(pool.clone());
        let events = SqlApprovalEventRepository::new(pool.clone());

        let seeded_employees = seed_employees();
        for employee in seeded_employees.clone() {
            employees.save(employee).await?;
        }

        let seeded_tiers = seed_tiers();
        for tier in seeded_tiers.clone() {
            tiers.save(tier).await?;
        }

        let seeded_expenses = seed_expenses();
        for expense in seeded_expenses.clone() {
            expenses.save(expense).await?;
        }

        // The event log is append-only, so reloading must not re-append.
        let existing = events
            .list_for_expense(&ExpenseId(SEED_APPROVED_EXPENSE.to_string()))
            .await?;
        if !existing.iter().any(|event| event.id.0 == SEED_APPROVED_EVENT) {
            events
                .append(ApprovalEvent {
                    id: ApprovalEventId(SEED_APPROVED_EVENT.to_string()),
                    expense_id: ExpenseId(SEED_APPROVED_EXPENSE.to_string()),
                    approver_id: EmployeeId("seed-mgr-platform".to_string()),
                    decision: Decision::Approved,
                    comment: Some("within petty cash limits".to_string()),
                    created_at: Utc::now(),
                })
                .await?;
        }

        Ok(SeedResult {
            employees: seeded_employees.len(),
            budget_tiers: seeded_tiers.len(),
            expenses: seeded_expenses.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let employees = SqlEmployeeRepository::new(pool.clone());
        let tiers = SqlBudgetTierRepository::new(pool.clone());
        let expenses = SqlExpenseRepository::new(pool.clone());
        let events = SqlApprovalEventRepository::new(pool.clone());

        let employee_count = employees.list_all().await?.len();
        let tier_count = tiers.list_active().await?.len();
        let pending = expenses
            .find_by_id(&ExpenseId(SEED_PENDING_EXPENSE.to_string()))
            .await?
            .map(|expense| {
                expense.status == ExpenseStatus::Pending && expense.current_approver.is_some()
            })
            .unwrap_or(false);
        let approved_log = events
            .list_for_expense(&ExpenseId(SEED_APPROVED_EXPENSE.to_string()))
            .await?
            .iter()
            .any(|event| event.decision == Decision::Approved);

        let checks = vec![
            ("employee-directory", employee_count >= seed_employees().len()),
            ("budget-tiers", tier_count >= seed_tiers().len()),
            ("pending-expense-routing", pending),
            ("approved-expense-log", approved_log),
        ];
        let all_present = checks.iter().all(|(_, passed)| *passed);

        Ok(VerificationResult { all_present, checks })
    }
}

#[cfg(test)]
mod tests {
    use outlay_core::domain::expense::ExpenseId;

    use super::{DemoDataset, SEED_APPROVED_EXPENSE};
    use crate::repositories::{ApprovalEventRepository, SqlApprovalEventRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = setup().await;

        let result = DemoDataset::load(&pool).await.expect("seed");
        assert_eq!(result.employees, 7);
        assert_eq!(result.budget_tiers, 3);

        let verification = DemoDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);
    }

    #[tokio::test]
    async fn seed_is_idempotent_for_the_append_only_log() {
        let pool = setup().await;

        DemoDataset::load(&pool).await.expect("first seed");
        DemoDataset::load(&pool).await.expect("second seed");

        let events = SqlApprovalEventRepository::new(pool.clone())
            .list_for_expense(&ExpenseId(SEED_APPROVED_EXPENSE.to_string()))
            .await
            .expect("list events");
        assert_eq!(events.len(), 1, "reload must not duplicate seeded decisions");

        let verification = DemoDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present);
    }
}
