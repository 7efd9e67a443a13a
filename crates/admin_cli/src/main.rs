use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{ApprovalState, Engine, Principal, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "autohub_admin")]
#[command(about = "Admin utilities for AutoHub (bootstrap admins, business approvals)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./autohub.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Admin(Admin),
    Business(Business),
    Sessions(Sessions),
}

#[derive(Args, Debug)]
struct Admin {
    #[command(subcommand)]
    command: AdminCommand,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Creates an admin account. Needs no credentials, only database access.
    Create(AdminCreateArgs),
}

#[derive(Args, Debug)]
struct AdminCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    contact: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    district: String,
}

#[derive(Args, Debug)]
struct Business {
    /// Email of the admin performing the action; the password is prompted.
    #[arg(long, env = "AUTOHUB_ADMIN_EMAIL")]
    admin_email: String,

    #[command(subcommand)]
    command: BusinessCommand,
}

#[derive(Subcommand, Debug)]
enum BusinessCommand {
    /// Lists garages and vendors awaiting approval.
    Pending,
    Approve { user_id: i32 },
    Reject { user_id: i32 },
}

#[derive(Args, Debug)]
struct Sessions {
    #[command(subcommand)]
    command: SessionsCommand,
}

#[derive(Subcommand, Debug)]
enum SessionsCommand {
    /// Deletes expired login sessions.
    Purge,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn login_admin(
    engine: &Engine,
    email: &str,
) -> Result<Principal, Box<dyn Error + Send + Sync>> {
    let password = prompt_password("Admin password: ")?;
    Ok(engine.authenticate(email, &password, Role::Admin).await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Admin(Admin {
            command: AdminCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let admin = match engine
                .create_admin(
                    &args.email,
                    &password,
                    &args.contact,
                    &args.city,
                    &args.district,
                )
                .await
            {
                Ok(admin) => admin,
                Err(engine::EngineError::DuplicateEmail) => {
                    eprintln!("user already exists: {}", args.email);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            };
            println!("created admin: {} (user #{})", args.email, admin.user_id);
        }
        Command::Business(business) => {
            let admin = login_admin(&engine, &business.admin_email).await?;
            match business.command {
                BusinessCommand::Pending => {
                    let pending = engine.pending_businesses(&admin).await?;
                    if pending.is_empty() {
                        println!("no pending businesses");
                    }
                    for row in pending {
                        println!(
                            "#{}\t{}\t{}\t{}\t{}",
                            row.user_id,
                            row.role,
                            row.email,
                            row.business_name.as_deref().unwrap_or("-"),
                            row.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
                BusinessCommand::Approve { user_id } => {
                    engine
                        .set_approval(&admin, user_id, ApprovalState::Approved)
                        .await?;
                    println!("approved user #{user_id}");
                }
                BusinessCommand::Reject { user_id } => {
                    engine
                        .set_approval(&admin, user_id, ApprovalState::Rejected)
                        .await?;
                    println!("rejected user #{user_id}");
                }
            }
        }
        Command::Sessions(Sessions {
            command: SessionsCommand::Purge,
        }) => {
            let purged = engine.purge_expired_sessions().await?;
            println!("purged {purged} expired sessions");
        }
    }

    Ok(())
}
