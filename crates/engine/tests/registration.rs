mod common;

use chrono::{Duration, Utc};
use engine::{
    ApprovalState, EngineError, MoneyCents, Role, locations, sessions, user_roles, users, vendors,
};
use migration::MigratorTrait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectOptions, ConnectionTrait, Database, EntityTrait,
    PaginatorTrait,
};

use common::{admin, customer, engine_with_db, registration};

#[tokio::test]
async fn customer_is_approved_with_opening_balance() {
    let engine = engine_with_db().await;
    let alice = customer(&engine, "alice@example.com").await;
    assert_eq!(alice.role, Role::Customer);
    assert_eq!(alice.business, None);

    let user = users::Entity::find_by_id(alice.user_id)
        .one(engine.database())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.approval_state().unwrap(), ApprovalState::Approved);
    assert_eq!(user.balance(), MoneyCents::from_units(10_000));
    assert_ne!(user.password_hash, "password");

    let principal = engine
        .authenticate("Alice@Example.com", "password", Role::Customer)
        .await
        .unwrap();
    assert_eq!(principal, alice);
    assert_eq!(principal.role.dashboard_path(), "/customer/dashboard");
}

#[tokio::test]
async fn opening_balance_is_configurable() {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db)
        .customer_opening_balance(MoneyCents::from_units(50))
        .build()
        .await
        .unwrap();

    let alice = customer(&engine, "alice@example.com").await;
    assert_eq!(
        engine.balance(alice.user_id).await.unwrap(),
        MoneyCents::from_units(50)
    );
}

#[tokio::test]
async fn duplicate_email_is_refused() {
    let engine = engine_with_db().await;
    customer(&engine, "alice@example.com").await;

    let err = engine
        .register(registration(" ALICE@example.com", Role::Vendor, Some("Dup")))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::DuplicateEmail);

    let vendors = vendors::Entity::find().count(engine.database()).await.unwrap();
    assert_eq!(vendors, 0);
}

#[tokio::test]
async fn invalid_registrations_are_rejected() {
    let engine = engine_with_db().await;

    let cases = [
        registration("", Role::Customer, None),
        registration("no-at-sign", Role::Customer, None),
        registration("garage@example.com", Role::Garage, None),
        registration("garage@example.com", Role::Garage, Some("   ")),
        registration("root@example.com", Role::Admin, None),
    ];
    for case in cases {
        let err = engine.register(case).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
    }
    assert_eq!(users::Entity::find().count(engine.database()).await.unwrap(), 0);
}

#[tokio::test]
async fn vendor_logs_in_only_after_approval() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let pending = engine
        .register(registration("parts@shop.test", Role::Vendor, Some("Spares Ltd")))
        .await
        .unwrap();
    assert_eq!(
        engine.balance(pending.user_id).await.unwrap(),
        MoneyCents::ZERO
    );

    let err = engine
        .authenticate("parts@shop.test", "password", Role::Vendor)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::PendingApproval);

    let queue = engine.pending_businesses(&admin).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].role, Role::Vendor);
    assert_eq!(queue[0].business_name.as_deref(), Some("Spares Ltd"));

    engine
        .set_approval(&admin, pending.user_id, ApprovalState::Approved)
        .await
        .unwrap();
    let vendor = engine
        .authenticate("parts@shop.test", "password", Role::Vendor)
        .await
        .unwrap();
    assert_eq!(vendor.business, pending.business);
    assert!(engine.pending_businesses(&admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_business_cannot_log_in() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage = engine
        .register(registration("fix@garage.test", Role::Garage, Some("Fix It")))
        .await
        .unwrap();

    engine
        .set_approval(&admin, garage.user_id, ApprovalState::Rejected)
        .await
        .unwrap();
    let err = engine
        .authenticate("fix@garage.test", "password", Role::Garage)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Rejected);
}

#[tokio::test]
async fn approval_targets_business_accounts_only() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let alice = customer(&engine, "alice@example.com").await;

    let err = engine
        .set_approval(&admin, alice.user_id, ApprovalState::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine
        .set_approval(&alice, alice.user_id, ApprovalState::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn wrong_password_or_role_is_invalid_credentials() {
    let engine = engine_with_db().await;
    customer(&engine, "alice@example.com").await;

    for (email, password, role) in [
        ("alice@example.com", "wrong", Role::Customer),
        ("alice@example.com", "password", Role::Vendor),
        ("nobody@example.com", "password", Role::Customer),
    ] {
        let err = engine.authenticate(email, password, role).await.unwrap_err();
        assert_eq!(err, EngineError::InvalidCredentials);
    }
}

#[tokio::test]
async fn failed_business_insert_rolls_back_everything() {
    let engine = engine_with_db().await;
    engine
        .database()
        .execute_unprepared(
            "CREATE TRIGGER fail_vendor BEFORE INSERT ON vendors \
             BEGIN SELECT RAISE(ABORT, 'vendor insert refused'); END;",
        )
        .await
        .unwrap();

    let err = engine
        .register(registration("parts@shop.test", Role::Vendor, Some("Spares Ltd")))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));

    let db = engine.database();
    assert_eq!(users::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(locations::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(user_roles::Entity::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn sessions_resolve_until_closed_or_expired() {
    let engine = engine_with_db().await;
    let alice = customer(&engine, "alice@example.com").await;

    let token = engine.open_session(&alice).await.unwrap();
    assert_eq!(engine.resolve_session(&token).await.unwrap(), Some(alice));
    assert_eq!(engine.resolve_session("not-a-token").await.unwrap(), None);

    engine.close_session(&token).await.unwrap();
    assert_eq!(engine.resolve_session(&token).await.unwrap(), None);

    let stale = engine.open_session(&alice).await.unwrap();
    sessions::ActiveModel {
        token: ActiveValue::Unchanged(stale.clone()),
        expires_at: ActiveValue::Set(Utc::now() - Duration::minutes(1)),
        ..Default::default()
    }
    .update(engine.database())
    .await
    .unwrap();
    assert_eq!(engine.resolve_session(&stale).await.unwrap(), None);
    assert!(
        sessions::Entity::find_by_id(stale)
            .one(engine.database())
            .await
            .unwrap()
            .is_none()
    );
}
