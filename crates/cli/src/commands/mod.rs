pub mod config;
pub mod decide;
pub mod doctor;
pub mod migrate;
pub mod preview;
pub mod seed;
pub mod submit;

use std::sync::Arc;

use serde::Serialize;

use outlay_db::repositories::{
    SqlApprovalEventRepository, SqlBudgetTierRepository, SqlEmployeeRepository,
    SqlExpenseRepository,
};
use outlay_db::{ApprovalService, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_details(command, message, None)
    }

    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Current-thread runtime for commands that touch the database.
fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, Box<CommandResult>> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        Box::new(CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        ))
    })
}

fn service_from_pool(pool: &DbPool) -> ApprovalService {
    ApprovalService::new(
        Arc::new(SqlEmployeeRepository::new(pool.clone())),
        Arc::new(SqlBudgetTierRepository::new(pool.clone())),
        Arc::new(SqlExpenseRepository::new(pool.clone())),
        Arc::new(SqlApprovalEventRepository::new(pool.clone())),
    )
}
