use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "usage: migration [up [N] | down [N] | fresh | refresh | status]";

/// Parses the optional step count following `up` / `down`.
fn steps(arg: Option<String>) -> Result<Option<u32>, String> {
    arg.map(|raw| {
        raw.parse::<u32>()
            .map_err(|_| format!("invalid step count `{raw}`\n{USAGE}"))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());

    // Same database the `autohub` binary opens by default.
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./autohub.db?mode=rwc".to_string());
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps(args.next())?).await?,
        "down" => migration::Migrator::down(&db, steps(args.next())?.or(Some(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        other => {
            eprintln!("unknown command `{other}`\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
