use bakehouse_db::{BakerySeedDataset, ClientSeedInfo};

use crate::commands::{open_database, prepare, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seeded = BakerySeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = BakerySeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<Vec<ClientSeedInfo>, StepFailure> = if verification.all_present {
            Ok(seeded.clients_seeded)
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(clients) => CommandResult::success("seed", seed_summary(&clients)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_summary(clients: &[ClientSeedInfo]) -> String {
    let lines = clients
        .iter()
        .map(|client| format!("  - {}: {}", client.name, order_count(client.total_orders)))
        .collect::<Vec<_>>();
    format!("bakery seed dataset loaded for {} clients:\n{}", clients.len(), lines.join("\n"))
}

fn order_count(count: u32) -> String {
    match count {
        1 => "1 order".to_string(),
        n => format!("{n} orders"),
    }
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
