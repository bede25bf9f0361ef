use chrono::{DateTime, Utc};
use sqlx::Row;

use outlay_core::domain::employee::{Employee, EmployeeId, Role};

use super::{EmployeeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_role(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        _ => Role::Standard,
    }
}

pub fn role_as_str(role: &Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Standard => "standard",
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_str: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level: i64 = row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let manager_id: Option<String> =
        row.try_get("manager_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let position: Option<String> =
        row.try_get("position").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department: Option<String> =
        row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let level = u8::try_from(level)
        .map_err(|_| RepositoryError::Decode(format!("org level out of range: {level}")))?;

    Ok(Employee {
        id: EmployeeId(id),
        name,
        email,
        role: parse_role(&role_str),
        level,
        manager_id: manager_id.map(EmployeeId),
        position,
        department,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

#[async_trait::async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, role, level, manager_id, position, department,
                    created_at, updated_at
             FROM employees WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_employee(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, name, email, role, level, manager_id, position, department,
                    created_at, updated_at
             FROM employees ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_employee).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employees (id, name, email, role, level, manager_id, position,
                                    department, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 role = excluded.role,
                 level = excluded.level,
                 manager_id = excluded.manager_id,
                 position = excluded.position,
                 department = excluded.department,
                 updated_at = excluded.updated_at",
        )
        .bind(&employee.id.0)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(role_as_str(&employee.role))
        .bind(i64::from(employee.level))
        .bind(employee.manager_id.as_ref().map(|id| id.0.as_str()))
        .bind(&employee.position)
        .bind(&employee.department)
        .bind(employee.created_at.to_rfc3339())
        .bind(employee.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use outlay_core::domain::employee::{Employee, EmployeeId, Role};

    use super::SqlEmployeeRepository;
    use crate::repositories::EmployeeRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_employee(id: &str, name: &str, manager_id: Option<&str>) -> Employee {
        let now = Utc::now();
        Employee {
            id: EmployeeId(id.to_string()),
            name: name.to_string(),
            email: format!("{id}@example.com"),
            role: Role::Standard,
            level: 3,
            manager_id: manager_id.map(|m| EmployeeId(m.to_string())),
            position: Some("Manager".to_string()),
            department: Some("Finance".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlEmployeeRepository::new(pool);

        let employee = sample_employee("emp-1", "Avery Chen", None);
        repo.save(employee.clone()).await.expect("save");

        let found = repo
            .find_by_id(&EmployeeId("emp-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.id, employee.id);
        assert_eq!(found.role, Role::Standard);
        assert_eq!(found.level, 3);
        assert!(found.manager_id.is_none());
    }

    #[tokio::test]
    async fn list_all_orders_by_name() {
        let pool = setup().await;
        let repo = SqlEmployeeRepository::new(pool);

        repo.save(sample_employee("emp-2", "Zoe Park", None)).await.expect("save 1");
        repo.save(sample_employee("emp-1", "Avery Chen", Some("emp-2"))).await.expect("save 2");

        let all = repo.list_all().await.expect("list");
        let names: Vec<&str> = all.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Avery Chen", "Zoe Park"]);
        assert_eq!(all[0].manager_id, Some(EmployeeId("emp-2".to_string())));
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlEmployeeRepository::new(pool);

        let employee = sample_employee("emp-1", "Avery Chen", None);
        repo.save(employee.clone()).await.expect("save");

        let mut promoted = employee;
        promoted.level = 2;
        promoted.position = Some("Director".to_string());
        repo.save(promoted).await.expect("upsert");

        let found = repo
            .find_by_id(&EmployeeId("emp-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.level, 2);
        assert_eq!(found.position.as_deref(), Some("Director"));
    }
}
