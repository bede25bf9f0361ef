use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Standard,
}

/// Organizational rank. Lower values carry higher authority: level 1 is the
/// top of the hierarchy, larger levels sit further down.
pub type OrgLevel = u8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub level: OrgLevel,
    pub manager_id: Option<EmployeeId>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Admins administer configuration; they never act as approvers.
    pub fn can_approve(&self) -> bool {
        self.role != Role::Admin
    }

    pub fn is_top_of_hierarchy(&self) -> bool {
        self.manager_id.is_none()
    }
}
