use engine::MoneyCents;
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "autohub={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let server = settings.server;
    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;

    let mut builder = engine::Engine::builder()
        .database(db)
        .session_ttl(chrono::Duration::hours(server.session_ttl_hours));
    if let Some(units) = server.customer_opening_balance {
        builder = builder.customer_opening_balance(MoneyCents::from_units(units));
    }
    let engine = builder.build().await?;

    match engine.purge_expired_sessions().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!("purged {purged} expired sessions"),
        Err(err) => tracing::warn!("failed to purge expired sessions: {err}"),
    }

    let config = server::ServerConfig {
        bind: server.bind.unwrap_or_else(|| "127.0.0.1".to_string()),
        port: server.port,
        upload_dir: server.upload_dir,
        max_upload_bytes: server.max_upload_bytes,
    };
    server::run(engine, config).await;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let mut options = sea_orm::ConnectOptions::new(url);
    if *config == Database::Memory {
        // every pooled connection would otherwise open its own empty database
        options.max_connections(1);
    }
    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
