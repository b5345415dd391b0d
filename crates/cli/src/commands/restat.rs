use std::sync::Arc;

use bakehouse_db::repositories::{SqlCustomerRepository, SqlOrderRepository};
use bakehouse_db::ClientDirectory;

use crate::commands::{open_database, prepare, CommandResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("restat") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let directory = ClientDirectory::new(
            Arc::new(SqlCustomerRepository::new(pool.clone())),
            Arc::new(SqlOrderRepository::new(pool.clone())),
            config.clients.clone(),
        );

        let refreshed = directory
            .recompute_all()
            .await
            .map_err(|error| ("stats_recompute", error.to_string(), 6u8));
        pool.close().await;
        refreshed
    });

    match result {
        Ok(count) => CommandResult::success("restat", recompute_message(count)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("restat", error_class, message, exit_code)
        }
    }
}

fn recompute_message(count: usize) -> String {
    match count {
        1 => "recomputed statistics for 1 client".to_string(),
        n => format!("recomputed statistics for {n} clients"),
    }
}
