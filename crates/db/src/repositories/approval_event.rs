use chrono::{DateTime, Utc};
use sqlx::Row;

use outlay_core::domain::decision::{ApprovalEvent, ApprovalEventId, Decision};
use outlay_core::domain::employee::EmployeeId;
use outlay_core::domain::expense::ExpenseId;

use super::{ApprovalEventRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApprovalEventRepository {
    pool: DbPool,
}

impl SqlApprovalEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_decision(s: &str) -> Decision {
    match s {
        "rejected" => Decision::Rejected,
        _ => Decision::Approved,
    }
}

pub fn decision_as_str(decision: &Decision) -> &'static str {
    match decision {
        Decision::Approved => "approved",
        Decision::Rejected => "rejected",
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalEvent, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let expense_id: String =
        row.try_get("expense_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decision_str: String =
        row.try_get("decision").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(ApprovalEvent {
        id: ApprovalEventId(id),
        expense_id: ExpenseId(expense_id),
        approver_id: EmployeeId(approver_id),
        decision: parse_decision(&decision_str),
        comment,
        created_at,
    })
}

#[async_trait::async_trait]
impl ApprovalEventRepository for SqlApprovalEventRepository {
    async fn append(&self, event: ApprovalEvent) -> Result<(), RepositoryError> {
        // Plain INSERT, no upsert clause: the log is append-only and a
        // conflicting id is a bug worth surfacing.
        sqlx::query(
            "INSERT INTO approval_events (id, expense_id, approver_id, decision, comment,
                                          created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id.0)
        .bind(&event.expense_id.0)
        .bind(&event.approver_id.0)
        .bind(decision_as_str(&event.decision))
        .bind(&event.comment)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_expense(
        &self,
        expense_id: &ExpenseId,
    ) -> Result<Vec<ApprovalEvent>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, expense_id, approver_id, decision, comment, created_at
             FROM approval_events WHERE expense_id = ? ORDER BY created_at, id",
        )
        .bind(&expense_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use outlay_core::domain::decision::{ApprovalEvent, Decision};
    use outlay_core::domain::employee::{Employee, EmployeeId, Role};
    use outlay_core::domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus, Urgency};

    use super::SqlApprovalEventRepository;
    use crate::repositories::{
        ApprovalEventRepository, EmployeeRepository, ExpenseRepository, SqlEmployeeRepository,
        SqlExpenseRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert_employee(pool: &sqlx::SqlitePool, id: &str) {
        let now = Utc::now();
        SqlEmployeeRepository::new(pool.clone())
            .save(Employee {
                id: EmployeeId(id.to_string()),
                name: format!("Employee {id}"),
                email: format!("{id}@example.com"),
                role: Role::Standard,
                level: 2,
                manager_id: None,
                position: None,
                department: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert employee");
    }

    async fn insert_expense(pool: &sqlx::SqlitePool, id: &str, submitter: &str) {
        let now = Utc::now();
        SqlExpenseRepository::new(pool.clone())
            .save(ExpenseRequest {
                id: ExpenseId(id.to_string()),
                title: "Supplies".to_string(),
                amount: Decimal::new(4_200, 2),
                category: "office".to_string(),
                description: "Whiteboard markers".to_string(),
                business_justification: "Team room restock".to_string(),
                status: ExpenseStatus::Pending,
                urgency: Urgency::Low,
                submitted_by: EmployeeId(submitter.to_string()),
                current_approver: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert expense");
    }

    #[tokio::test]
    async fn append_and_list_preserves_insertion_order() {
        let pool = setup().await;
        insert_employee(&pool, "emp-1").await;
        insert_employee(&pool, "emp-2").await;
        insert_employee(&pool, "emp-3").await;
        insert_expense(&pool, "exp-1", "emp-1").await;

        let repo = SqlApprovalEventRepository::new(pool);

        let first = ApprovalEvent::record(
            ExpenseId("exp-1".to_string()),
            EmployeeId("emp-2".to_string()),
            Decision::Approved,
            None,
        );
        let second = ApprovalEvent::record(
            ExpenseId("exp-1".to_string()),
            EmployeeId("emp-3".to_string()),
            Decision::Approved,
            Some("ok within budget".to_string()),
        );
        repo.append(first.clone()).await.expect("append 1");
        repo.append(second.clone()).await.expect("append 2");

        let events = repo.list_for_expense(&ExpenseId("exp-1".to_string())).await.expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].approver_id.0, "emp-2");
        assert_eq!(events[1].approver_id.0, "emp-3");
        assert_eq!(events[1].comment.as_deref(), Some("ok within budget"));
    }

    #[tokio::test]
    async fn duplicate_approver_entries_are_kept_as_separate_rows() {
        let pool = setup().await;
        insert_employee(&pool, "emp-1").await;
        insert_employee(&pool, "emp-2").await;
        insert_expense(&pool, "exp-1", "emp-1").await;

        let repo = SqlApprovalEventRepository::new(pool);
        for _ in 0..2 {
            repo.append(ApprovalEvent::record(
                ExpenseId("exp-1".to_string()),
                EmployeeId("emp-2".to_string()),
                Decision::Approved,
                None,
            ))
            .await
            .expect("append");
        }

        let events = repo.list_for_expense(&ExpenseId("exp-1".to_string())).await.expect("list");
        assert_eq!(events.len(), 2, "append-only log keeps every recorded decision");
    }

    #[tokio::test]
    async fn replaying_the_same_event_id_is_rejected() {
        let pool = setup().await;
        insert_employee(&pool, "emp-1").await;
        insert_employee(&pool, "emp-2").await;
        insert_expense(&pool, "exp-1", "emp-1").await;

        let repo = SqlApprovalEventRepository::new(pool);
        let event = ApprovalEvent::record(
            ExpenseId("exp-1".to_string()),
            EmployeeId("emp-2".to_string()),
            Decision::Rejected,
            None,
        );

        repo.append(event.clone()).await.expect("append");
        assert!(repo.append(event).await.is_err(), "immutable rows must not be overwritten");
    }
}
