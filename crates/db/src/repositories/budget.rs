use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use outlay_core::domain::budget::{BudgetTier, BudgetTierId};
use outlay_core::domain::employee::OrgLevel;

use super::{BudgetTierRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBudgetTierRepository {
    pool: DbPool,
}

impl SqlBudgetTierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|_| RepositoryError::Decode(format!("invalid amount literal: {raw}")))
}

fn parse_levels(raw: &str) -> Result<Vec<OrgLevel>, RepositoryError> {
    serde_json::from_str::<Vec<OrgLevel>>(raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid approver_levels json: {e}")))
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_tier(row: &sqlx::sqlite::SqliteRow) -> Result<BudgetTier, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let min_amount_str: String =
        row.try_get("min_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let max_amount_str: String =
        row.try_get("max_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let levels_str: String =
        row.try_get("approver_levels").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(BudgetTier {
        id: BudgetTierId(id),
        name,
        min_amount: parse_amount(&min_amount_str)?,
        max_amount: parse_amount(&max_amount_str)?,
        approver_levels: parse_levels(&levels_str)?,
        description,
        is_active: is_active != 0,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

#[async_trait::async_trait]
impl BudgetTierRepository for SqlBudgetTierRepository {
    async fn list_active(&self) -> Result<Vec<BudgetTier>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, name, min_amount, max_amount, approver_levels, description,
                    is_active, created_at, updated_at
             FROM budget_tiers WHERE is_active = 1 ORDER BY CAST(min_amount AS REAL), id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tier).collect::<Result<Vec<_>, _>>()
    }

    async fn find_for_amount(
        &self,
        amount: Decimal,
    ) -> Result<Option<BudgetTier>, RepositoryError> {
        // Amounts are stored as decimal text; range filtering happens here
        // rather than in SQL so comparison semantics match the core's.
        let tiers = self.list_active().await?;
        Ok(tiers.into_iter().find(|tier| tier.contains(amount)))
    }

    async fn save(&self, tier: BudgetTier) -> Result<(), RepositoryError> {
        let levels_json = serde_json::to_string(&tier.approver_levels)
            .map_err(|e| RepositoryError::Decode(format!("approver_levels encode: {e}")))?;

        sqlx::query(
            "INSERT INTO budget_tiers (id, name, min_amount, max_amount, approver_levels,
                                       description, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 min_amount = excluded.min_amount,
                 max_amount = excluded.max_amount,
                 approver_levels = excluded.approver_levels,
                 description = excluded.description,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&tier.id.0)
        .bind(&tier.name)
        .bind(tier.min_amount.to_string())
        .bind(tier.max_amount.to_string())
        .bind(levels_json)
        .bind(&tier.description)
        .bind(i64::from(tier.is_active))
        .bind(tier.created_at.to_rfc3339())
        .bind(tier.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate(&self, id: &BudgetTierId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE budget_tiers SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
