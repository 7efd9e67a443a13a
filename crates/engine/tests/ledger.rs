mod common;

use engine::{
    BusinessRef, EngineError, ListingKind, ListingRef, MoneyCents, OrderRequest, Principal, Role,
    TransactionStatus,
};

use common::{admin, approved_business, customer, engine_with_db, listing};

fn order(item: ListingRef, business: BusinessRef) -> OrderRequest {
    OrderRequest {
        item,
        business,
        price_snapshot: None,
    }
}

async fn vendor_with_part(engine: &engine::Engine, units: i64) -> (Principal, ListingRef) {
    let admin = admin(engine).await;
    let vendor =
        approved_business(engine, &admin, "parts@shop.test", Role::Vendor, "Spares Ltd").await;
    let part = engine
        .add_listing(&vendor, listing("Brake pads", units))
        .await
        .unwrap();
    (vendor, part.reference)
}

#[tokio::test]
async fn customer_pays_once_for_a_part() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 2_500).await;
    let alice = customer(&engine, "alice@example.com").await;
    assert_eq!(
        engine.balance(alice.user_id).await.unwrap(),
        MoneyCents::from_units(10_000)
    );

    let entry = engine
        .request_order(&alice, order(part, vendor.business.unwrap()))
        .await
        .unwrap();
    assert_eq!(entry.status, TransactionStatus::Pending);
    assert_eq!(entry.amount, MoneyCents::from_units(2_500));
    assert_eq!(
        engine.balance(alice.user_id).await.unwrap(),
        MoneyCents::from_units(10_000)
    );

    let done = engine.finalize(&alice, entry.id).await.unwrap();
    assert_eq!(done.entry.status, TransactionStatus::Completed);
    assert_eq!(done.balance, MoneyCents::from_units(7_500));

    let again = engine.finalize(&alice, entry.id).await;
    assert!(matches!(again, Err(EngineError::InvalidState(_))));
    assert_eq!(
        engine.balance(alice.user_id).await.unwrap(),
        MoneyCents::from_units(7_500)
    );
}

#[tokio::test]
async fn recharge_adds_positive_amounts_only() {
    let engine = engine_with_db().await;
    let alice = customer(&engine, "alice@example.com").await;

    let balance = engine
        .recharge(alice.user_id, MoneyCents::new(1_050))
        .await
        .unwrap();
    assert_eq!(balance, MoneyCents::new(1_000_000 + 1_050));

    for amount in [MoneyCents::ZERO, MoneyCents::new(-500)] {
        let err = engine.recharge(alice.user_id, amount).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
    assert_eq!(engine.balance(alice.user_id).await.unwrap(), balance);

    let missing = engine.recharge(9_999, MoneyCents::new(100)).await;
    assert!(matches!(missing, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn recharge_refuses_to_overflow_the_balance() {
    let engine = engine_with_db().await;
    let alice = customer(&engine, "alice@example.com").await;

    let huge = MoneyCents::from_units(90_000_000_000_000_000);
    let balance = engine.recharge(alice.user_id, huge).await.unwrap();

    let err = engine.recharge(alice.user_id, huge).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(engine.balance(alice.user_id).await.unwrap(), balance);
}

#[tokio::test]
async fn finalize_refuses_when_balance_is_short() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 20_000).await;
    let alice = customer(&engine, "alice@example.com").await;

    let entry = engine
        .request_order(&alice, order(part, vendor.business.unwrap()))
        .await
        .unwrap();
    let err = engine.finalize(&alice, entry.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert_eq!(
        engine.balance(alice.user_id).await.unwrap(),
        MoneyCents::from_units(10_000)
    );
    let history = engine.customer_history(alice.user_id).await.unwrap();
    assert_eq!(history[0].entry.status, TransactionStatus::Pending);

    engine
        .recharge(alice.user_id, MoneyCents::from_units(10_000))
        .await
        .unwrap();
    let done = engine.finalize(&alice, entry.id).await.unwrap();
    assert_eq!(done.balance, MoneyCents::ZERO);
}

#[tokio::test]
async fn concurrent_finalizes_never_overdraw() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 6_000).await;
    let alice = customer(&engine, "alice@example.com").await;
    let business = vendor.business.unwrap();

    let first = engine.request_order(&alice, order(part, business)).await.unwrap();
    let second = engine.request_order(&alice, order(part, business)).await.unwrap();

    let (a, b) = tokio::join!(
        engine.finalize(&alice, first.id),
        engine.finalize(&alice, second.id)
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(EngineError::InsufficientFunds(_))))
    );
    assert_eq!(
        engine.balance(alice.user_id).await.unwrap(),
        MoneyCents::from_units(4_000)
    );

    let completed = engine
        .customer_history(alice.user_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|h| h.entry.status == TransactionStatus::Completed)
        .count();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn client_price_snapshot_is_ignored() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 2_500).await;
    let alice = customer(&engine, "alice@example.com").await;

    let entry = engine
        .request_order(
            &alice,
            OrderRequest {
                item: part,
                business: vendor.business.unwrap(),
                price_snapshot: Some(MoneyCents::new(1)),
            },
        )
        .await
        .unwrap();
    assert_eq!(entry.amount, MoneyCents::from_units(2_500));

    let zero = engine
        .request_order(
            &alice,
            OrderRequest {
                item: part,
                business: vendor.business.unwrap(),
                price_snapshot: Some(MoneyCents::ZERO),
            },
        )
        .await;
    assert!(matches!(zero, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn request_checks_item_and_business_pairing() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 100).await;
    let alice = customer(&engine, "alice@example.com").await;
    let vendor_ref = vendor.business.unwrap();

    let as_service = ListingRef {
        kind: ListingKind::Service,
        id: part.id,
    };
    let err = engine
        .request_order(&alice, order(as_service, vendor_ref))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .request_order(&alice, order(part, BusinessRef::vendor(vendor_ref.id + 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let no_id = ListingRef {
        kind: ListingKind::Part,
        id: 0,
    };
    let err = engine
        .request_order(&alice, order(no_id, vendor_ref))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .request_order(&vendor, order(part, vendor_ref))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn finalize_is_scoped_to_the_initiator() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 100).await;
    let alice = customer(&engine, "alice@example.com").await;
    let bob = customer(&engine, "bob@example.com").await;

    let entry = engine
        .request_order(&alice, order(part, vendor.business.unwrap()))
        .await
        .unwrap();
    let err = engine.finalize(&bob, entry.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(
        engine.balance(bob.user_id).await.unwrap(),
        MoneyCents::from_units(10_000)
    );
}

#[tokio::test]
async fn completed_transactions_are_rated_once() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 100).await;
    let alice = customer(&engine, "alice@example.com").await;

    let entry = engine
        .request_order(&alice, order(part, vendor.business.unwrap()))
        .await
        .unwrap();
    let pending = engine.rate_transaction(&alice, entry.id, 4, None).await;
    assert!(matches!(pending, Err(EngineError::InvalidState(_))));

    engine.finalize(&alice, entry.id).await.unwrap();
    let out_of_range = engine.rate_transaction(&alice, entry.id, 6, None).await;
    assert!(matches!(out_of_range, Err(EngineError::Validation(_))));

    let rating = engine
        .rate_transaction(&alice, entry.id, 5, Some("quick delivery"))
        .await
        .unwrap();
    assert_eq!(rating.vendor_id, Some(vendor.business.unwrap().id));
    assert_eq!(rating.comment.as_deref(), Some("quick delivery"));

    let twice = engine.rate_transaction(&alice, entry.id, 3, None).await;
    assert!(matches!(twice, Err(EngineError::InvalidState(_))));

    let history = engine.customer_history(alice.user_id).await.unwrap();
    assert!(history[0].has_rated);
    assert_eq!(history[0].business_name.as_deref(), Some("Spares Ltd"));
    assert_eq!(history[0].item_name.as_deref(), Some("Brake pads"));
    assert_eq!(history[0].business_owner_user_id, Some(vendor.user_id));

    let dashboard = engine.business_dashboard(&vendor).await.unwrap();
    assert_eq!(dashboard.average_rating, Some(5.0));
    assert_eq!(dashboard.orders_last_7_days, 1);
    assert_eq!(dashboard.pending_orders, 0);
}

#[tokio::test]
async fn business_sees_received_orders_by_status() {
    let engine = engine_with_db().await;
    let (vendor, part) = vendor_with_part(&engine, 100).await;
    let alice = customer(&engine, "alice@example.com").await;
    let business = vendor.business.unwrap();

    let paid = engine.request_order(&alice, order(part, business)).await.unwrap();
    engine.request_order(&alice, order(part, business)).await.unwrap();
    engine.finalize(&alice, paid.id).await.unwrap();

    let all = engine.business_transactions(&vendor, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|o| o.customer_email == "alice@example.com"));

    let pending = engine
        .business_transactions(&vendor, Some(TransactionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_ne!(pending[0].entry.id, paid.id);

    let err = engine.business_transactions(&alice, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}
