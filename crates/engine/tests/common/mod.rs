#![allow(dead_code)]

use engine::{ApprovalState, Engine, ListingInput, MoneyCents, NewRegistration, Principal, Role};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database};

/// Fresh in-memory database with the full schema. One connection, so every
/// DB transaction is serialized.
pub async fn engine_with_db() -> Engine {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

pub fn registration(email: &str, role: Role, business_name: Option<&str>) -> NewRegistration {
    NewRegistration {
        email: email.to_string(),
        password: "password".to_string(),
        role,
        contact: "0700 000 000".to_string(),
        city: "Nairobi".to_string(),
        district: "Westlands".to_string(),
        business_name: business_name.map(ToString::to_string),
    }
}

pub async fn admin(engine: &Engine) -> Principal {
    engine
        .create_admin("admin@autohub.test", "password", "0711", "Nairobi", "CBD")
        .await
        .unwrap()
}

pub async fn customer(engine: &Engine, email: &str) -> Principal {
    engine
        .register(registration(email, Role::Customer, None))
        .await
        .unwrap()
}

/// Registers a garage or vendor, has `admin` approve it and logs it in.
pub async fn approved_business(
    engine: &Engine,
    admin: &Principal,
    email: &str,
    role: Role,
    name: &str,
) -> Principal {
    let pending = engine
        .register(registration(email, role, Some(name)))
        .await
        .unwrap();
    engine
        .set_approval(admin, pending.user_id, ApprovalState::Approved)
        .await
        .unwrap();
    engine.authenticate(email, "password", role).await.unwrap()
}

pub fn listing(name: &str, units: i64) -> ListingInput {
    ListingInput {
        name: name.to_string(),
        price: MoneyCents::from_units(units),
        description: None,
        image_path: None,
    }
}
