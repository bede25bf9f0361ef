use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::OrgLevel;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetTierId(pub String);

/// Configuration row mapping a closed amount range to the organizational
/// levels that must approve amounts inside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetTier {
    pub id: BudgetTierId,
    pub name: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub approver_levels: Vec<OrgLevel>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetTier {
    pub fn contains(&self, amount: Decimal) -> bool {
        self.min_amount <= amount && amount <= self.max_amount
    }

    /// Required levels in resolution order: descending numeric value, so the
    /// most junior required level is processed first and the most senior
    /// last. Duplicates in the configured list are collapsed.
    pub fn levels_in_resolution_order(&self) -> Vec<OrgLevel> {
        let mut levels = self.approver_levels.clone();
        levels.sort_unstable_by(|left, right| right.cmp(left));
        levels.dedup();
        levels
    }
}
