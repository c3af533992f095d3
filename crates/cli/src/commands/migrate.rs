use devteam_db::{connect_with_settings, migrations};

use crate::commands::{current_thread_runtime, load_config, CommandResult, ErrorClass, MIGRATE};

pub fn run() -> CommandResult {
    let config = match load_config(MIGRATE) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime(MIGRATE) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| (ErrorClass::DbConnectivity, error.to_string()))?;
        let applied = migrations::run_pending(&pool)
            .await
            .map_err(|error| (ErrorClass::Migration, error.to_string()));
        pool.close().await;
        applied
    });

    match result {
        Ok(()) => CommandResult::success(
            MIGRATE,
            format!("applied pending migrations to `{}`", config.database.url),
        ),
        Err((error_class, message)) => CommandResult::failure(MIGRATE, error_class, message),
    }
}
