mod common;

use engine::{EngineError, Role};

use common::{admin, approved_business, customer, engine_with_db};

#[tokio::test]
async fn threads_and_conversations() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage =
        approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;
    let alice = customer(&engine, "alice@example.com").await;
    let bob = customer(&engine, "bob@example.com").await;

    engine
        .send_message(alice.user_id, garage.user_id, "Do you fix brakes?")
        .await
        .unwrap();
    engine
        .send_message(garage.user_id, alice.user_id, "Yes, come by.")
        .await
        .unwrap();
    engine
        .send_message(bob.user_id, alice.user_id, "Hi Alice")
        .await
        .unwrap();

    let threads = engine.message_threads(alice.user_id).await.unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].partner_user_id, bob.user_id);
    assert_eq!(threads[0].partner_name, "bob");
    assert_eq!(threads[1].partner_name, "Fix It");
    assert_eq!(threads[1].last_body, "Yes, come by.");

    let conversation = engine
        .conversation(alice.user_id, garage.user_id)
        .await
        .unwrap();
    let flags: Vec<_> = conversation.iter().map(|m| m.is_sender).collect();
    assert_eq!(flags, vec![true, false]);
    assert_eq!(conversation[0].body, "Do you fix brakes?");

    assert_eq!(engine.display_name(garage.user_id).await.unwrap(), "Fix It");
}

#[tokio::test]
async fn invalid_messages_are_refused() {
    let engine = engine_with_db().await;
    let alice = customer(&engine, "alice@example.com").await;
    let bob = customer(&engine, "bob@example.com").await;

    let err = engine
        .send_message(alice.user_id, bob.user_id, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .send_message(alice.user_id, alice.user_id, "hello me")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .send_message(alice.user_id, 4_242, "anyone?")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    assert!(engine.message_threads(bob.user_id).await.unwrap().is_empty());
}
