use outlay_core::config::{AppConfig, LoadOptions};
use outlay_core::domain::decision::Decision;
use outlay_core::domain::employee::EmployeeId;
use outlay_core::domain::expense::ExpenseId;
use outlay_db::{connect_with_settings, ServiceError};

use crate::commands::{build_runtime, service_from_pool, CommandResult};

pub fn run(
    expense: &str,
    approver: &str,
    approve: bool,
    reject: bool,
    comment: Option<String>,
) -> CommandResult {
    let decision = match (approve, reject) {
        (true, false) => Decision::Approved,
        (false, true) => Decision::Rejected,
        _ => {
            return CommandResult::failure(
                "decide",
                "invalid_argument",
                "exactly one of --approve or --reject is required",
                2,
            );
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "decide",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("decide") {
        Ok(runtime) => runtime,
        Err(failure) => return *failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let service = service_from_pool(&pool);
        let outcome = service
            .record_decision(
                &ExpenseId(expense.to_string()),
                &EmployeeId(approver.to_string()),
                decision,
                comment,
            )
            .await
            .map_err(|error| {
                let (class, exit_code) = match &error {
                    ServiceError::ExpenseNotFound(_) => ("not_found", 7u8),
                    ServiceError::Workflow(_) | ServiceError::Domain(_) => ("domain", 7u8),
                    ServiceError::Repository(_) => ("db_connectivity", 4u8),
                };
                let detail = error.to_string();
                let hint = error.into_application().user_message();
                (class, format!("{detail} ({hint})"), exit_code)
            })?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(outcome)
    });

    match result {
        Ok(outcome) => {
            let details = serde_json::json!({
                "next_approver": outcome.next_approver.as_ref().map(|id| id.0.clone()),
                "terminal": outcome.terminal,
            });
            let message = match (&outcome.next_approver, &outcome.terminal) {
                (Some(next), _) => format!("recorded; now awaiting `{}`", next.0),
                (None, Some(terminal)) => format!("recorded; request is terminal: {terminal:?}"),
                (None, None) => "recorded".to_string(),
            };
            CommandResult::success_with_details("decide", message, Some(details))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("decide", error_class, message, exit_code)
        }
    }
}
