use std::sync::Arc;

use ballot_backend::{build_rocket, config::Config, pg_store::PgBlobStore, routes::AppState};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::{info, warn};

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting nominee vote server");

    let config = Config::from_lookup(|key| secret_store.get(key)).map_err(CustomError::new)?;
    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not found - admin endpoints will reject every request");
    }
    info!("🗳️ {} nominees on the ballot", config.nominees.len());

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let store = Arc::new(PgBlobStore::new(pool));
    let state = AppState::new(&config, store);
    let rocket = build_rocket(state, config.allowed_origins.clone());

    Ok(rocket.into())
}
