use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use outlay_core::domain::employee::EmployeeId;
use outlay_core::domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus, Urgency};

use super::{ExpenseRepository, RepositoryError};
use crate::DbPool;

pub struct SqlExpenseRepository {
    pool: DbPool,
}

impl SqlExpenseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> ExpenseStatus {
    match s {
        "approved" => ExpenseStatus::Approved,
        "rejected" => ExpenseStatus::Rejected,
        _ => ExpenseStatus::Pending,
    }
}

pub fn status_as_str(status: &ExpenseStatus) -> &'static str {
    match status {
        ExpenseStatus::Pending => "pending",
        ExpenseStatus::Approved => "approved",
        ExpenseStatus::Rejected => "rejected",
    }
}

fn parse_urgency(s: &str) -> Urgency {
    match s {
        "low" => Urgency::Low,
        "high" => Urgency::High,
        _ => Urgency::Medium,
    }
}

pub fn urgency_as_str(urgency: &Urgency) -> &'static str {
    match urgency {
        Urgency::Low => "low",
        Urgency::Medium => "medium",
        Urgency::High => "high",
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<ExpenseRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let business_justification: String = row
        .try_get("business_justification")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let urgency_str: String =
        row.try_get("urgency").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_by: String =
        row.try_get("submitted_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approver: Option<String> =
        row.try_get("current_approver").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let amount = Decimal::from_str(&amount_str)
        .map_err(|_| RepositoryError::Decode(format!("invalid amount literal: {amount_str}")))?;

    Ok(ExpenseRequest {
        id: ExpenseId(id),
        title,
        amount,
        category,
        description,
        business_justification,
        status: parse_status(&status_str),
        urgency: parse_urgency(&urgency_str),
        submitted_by: EmployeeId(submitted_by),
        current_approver: current_approver.map(EmployeeId),
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

const SELECT_COLUMNS: &str = "SELECT id, title, amount, category, description, \
                              business_justification, status, urgency, submitted_by, \
                              current_approver, created_at, updated_at FROM expense_requests";

#[async_trait::async_trait]
impl ExpenseRepository for SqlExpenseRepository {
    async fn find_by_id(
        &self,
        id: &ExpenseId,
    ) -> Result<Option<ExpenseRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_expense(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, expense: ExpenseRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO expense_requests (id, title, amount, category, description,
                                           business_justification, status, urgency,
                                           submitted_by, current_approver, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 amount = excluded.amount,
                 category = excluded.category,
                 description = excluded.description,
                 business_justification = excluded.business_justification,
                 status = excluded.status,
                 urgency = excluded.urgency,
                 current_approver = excluded.current_approver,
                 updated_at = excluded.updated_at",
        )
        .bind(&expense.id.0)
        .bind(&expense.title)
        .bind(expense.amount.to_string())
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(&expense.business_justification)
        .bind(status_as_str(&expense.status))
        .bind(urgency_as_str(&expense.urgency))
        .bind(&expense.submitted_by.0)
        .bind(expense.current_approver.as_ref().map(|id| id.0.as_str()))
        .bind(expense.created_at.to_rfc3339())
        .bind(expense.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_submitter(
        &self,
        submitter: &EmployeeId,
    ) -> Result<Vec<ExpenseRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&format!("{SELECT_COLUMNS} WHERE submitted_by = ? ORDER BY created_at DESC"))
                .bind(&submitter.0)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_expense).collect::<Result<Vec<_>, _>>()
    }

    async fn list_pending_for_approver(
        &self,
        approver: &EmployeeId,
    ) -> Result<Vec<ExpenseRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE current_approver = ? AND status = 'pending'
             ORDER BY created_at DESC"
        ))
        .bind(&approver.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_expense).collect::<Result<Vec<_>, _>>()
    }
}
