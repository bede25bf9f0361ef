use std::str::FromStr;

use rust_decimal::Decimal;

use outlay_core::config::{AppConfig, LoadOptions};
use outlay_core::domain::employee::EmployeeId;
use outlay_db::connect_with_settings;

use crate::commands::{build_runtime, service_from_pool, CommandResult};

pub fn run(submitter: &str, amount: &str) -> CommandResult {
    let Ok(amount) = Decimal::from_str(amount) else {
        return CommandResult::failure(
            "preview",
            "invalid_argument",
            format!("`{amount}` is not a valid amount"),
            2,
        );
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "preview",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("preview") {
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
        let chain = service
            .preview_chain(&EmployeeId(submitter.to_string()), amount)
            .await
            .map_err(|error| ("preview", error.to_string(), 4u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(chain)
    });

    match result {
        Ok(chain) => {
            let details = serde_json::json!({
                "chain": chain
                    .iter()
                    .map(|stop| {
                        serde_json::json!({
                            "approver_id": stop.approver_id.0,
                            "name": stop.name,
                            "level": stop.level,
                        })
                    })
                    .collect::<Vec<_>>(),
            });
            let message = if chain.is_empty() {
                "no approval required for this submitter and amount".to_string()
            } else {
                format!("{} approver(s) required", chain.len())
            };
            CommandResult::success_with_details("preview", message, Some(details))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("preview", error_class, message, exit_code)
        }
    }
}
