use std::str::FromStr;

use rust_decimal::Decimal;

use outlay_core::config::{AppConfig, LoadOptions};
use outlay_core::domain::employee::EmployeeId;
use outlay_core::domain::expense::Urgency;
use outlay_db::{connect_with_settings, NewExpense};

use crate::commands::{build_runtime, service_from_pool, CommandResult};

pub struct SubmitArgs {
    pub submitter: String,
    pub amount: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub justification: String,
    pub urgency: String,
}

fn parse_urgency(raw: &str) -> Option<Urgency> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Some(Urgency::Low),
        "medium" => Some(Urgency::Medium),
        "high" => Some(Urgency::High),
        _ => None,
    }
}

pub fn run(args: SubmitArgs) -> CommandResult {
    let Ok(amount) = Decimal::from_str(&args.amount) else {
        return CommandResult::failure(
            "submit",
            "invalid_argument",
            format!("`{}` is not a valid amount", args.amount),
            2,
        );
    };

    let Some(urgency) = parse_urgency(&args.urgency) else {
        return CommandResult::failure(
            "submit",
            "invalid_argument",
            format!("`{}` is not a valid urgency (expected low|medium|high)", args.urgency),
            2,
        );
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("submit") {
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
        let submission = service
            .submit_expense(NewExpense {
                title: args.title,
                amount,
                category: args.category,
                description: args.description,
                business_justification: args.justification,
                urgency,
                submitted_by: EmployeeId(args.submitter),
            })
            .await
            .map_err(|error| ("submission", error.to_string(), 4u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(submission)
    });

    match result {
        Ok(submission) => {
            let details = serde_json::json!({
                "expense_id": submission.expense.id.0,
                "status": submission.expense.status,
                "current_approver": submission.expense.current_approver.as_ref().map(|id| id.0.clone()),
                "chain": submission.chain.iter().map(|id| id.0.clone()).collect::<Vec<_>>(),
            });
            let message = match &submission.expense.current_approver {
                Some(approver) => format!("submitted; routed to `{}`", approver.0),
                None => "submitted; no approval required, auto-approved".to_string(),
            };
            CommandResult::success_with_details("submit", message, Some(details))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("submit", error_class, message, exit_code)
        }
    }
}
