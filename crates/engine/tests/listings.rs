mod common;

use engine::{
    BusinessKind, EngineError, ListingInput, ListingKind, MoneyCents, OrderRequest, Role,
    SearchFilter,
};

use common::{admin, approved_business, customer, engine_with_db, listing};

#[tokio::test]
async fn garage_manages_its_own_services() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage =
        approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;

    let service = engine
        .add_listing(
            &garage,
            ListingInput {
                image_path: Some("service_images/1_1.png".to_string()),
                ..listing("Oil change", 2_500)
            },
        )
        .await
        .unwrap();
    assert_eq!(service.reference.kind, ListingKind::Service);
    assert_eq!(service.business, garage.business.unwrap());

    let edited = engine
        .edit_listing(&garage, service.reference.id, listing("Full service", 4_000))
        .await
        .unwrap();
    assert_eq!(edited.name, "Full service");
    assert_eq!(edited.price, MoneyCents::from_units(4_000));
    assert_eq!(edited.image_path.as_deref(), Some("service_images/1_1.png"));

    let previous = engine
        .set_listing_image(&garage, service.reference.id, "service_images/1_2.png")
        .await
        .unwrap();
    assert_eq!(previous.as_deref(), Some("service_images/1_1.png"));

    let listings = engine.listings_for(garage.business.unwrap()).await.unwrap();
    assert_eq!(listings.len(), 1);

    let deleted = engine.delete_listing(&garage, service.reference.id).await.unwrap();
    assert_eq!(deleted.image_path.as_deref(), Some("service_images/1_2.png"));
    assert!(matches!(
        engine.listing(&garage, service.reference.id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn listing_writes_are_scoped_to_the_owner() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let fix = approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;
    let other =
        approved_business(&engine, &admin, "other@garage.test", Role::Garage, "Other").await;
    let alice = customer(&engine, "alice@example.com").await;

    let service = engine.add_listing(&fix, listing("Alignment", 1_000)).await.unwrap();

    let err = engine
        .edit_listing(&other, service.reference.id, listing("Hijack", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    let err = engine
        .delete_listing(&other, service.reference.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine.add_listing(&alice, listing("Nope", 1)).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine.add_listing(&fix, listing("  ", 10)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let err = engine.add_listing(&fix, listing("Free", 0)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_listing_keeps_its_transactions() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage =
        approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;
    let alice = customer(&engine, "alice@example.com").await;

    let service = engine.add_listing(&garage, listing("Tune up", 300)).await.unwrap();
    let entry = engine
        .request_order(
            &alice,
            OrderRequest {
                item: service.reference,
                business: garage.business.unwrap(),
                price_snapshot: None,
            },
        )
        .await
        .unwrap();
    engine.delete_listing(&garage, service.reference.id).await.unwrap();

    let history = engine.customer_history(alice.user_id).await.unwrap();
    assert_eq!(history[0].entry.id, entry.id);
    assert_eq!(history[0].entry.item, None);
    assert_eq!(history[0].item_name, None);
    assert_eq!(history[0].entry.amount, MoneyCents::from_units(300));
    assert_eq!(history[0].business_name.as_deref(), Some("Fix It"));
}

#[tokio::test]
async fn search_matches_items_and_businesses() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage =
        approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;
    let vendor =
        approved_business(&engine, &admin, "parts@shop.test", Role::Vendor, "Brake World").await;

    engine.add_listing(&garage, listing("Brake repair", 1_500)).await.unwrap();
    engine.add_listing(&garage, listing("Oil change", 800)).await.unwrap();
    engine.add_listing(&vendor, listing("Disc rotor", 4_000)).await.unwrap();

    let hits = engine
        .search_listings(SearchFilter {
            query: Some("BRAKE".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = hits.iter().map(|h| h.listing.name.as_str()).collect();
    assert_eq!(names, vec!["Brake repair", "Disc rotor"]);
    assert_eq!(hits[1].business_name, "Brake World");
    assert_eq!(hits[1].business_owner_user_id, vendor.user_id);
    assert_eq!(hits[1].city.as_deref(), Some("Nairobi"));

    let hits = engine
        .search_listings(SearchFilter {
            category: Some("oil".to_string()),
            target: Some(BusinessKind::Garage),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].listing.name, "Oil change");

    let hits = engine
        .search_listings(SearchFilter {
            query: Some("brake".to_string()),
            target: Some(BusinessKind::Vendor),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].listing.reference.kind, ListingKind::Part);
}

#[tokio::test]
async fn home_view_shows_newest_listings_per_kind() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage =
        approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;
    for i in 0..8 {
        engine
            .add_listing(&garage, listing(&format!("Service {i}"), 100))
            .await
            .unwrap();
    }

    let hits = engine.search_listings(SearchFilter::default()).await.unwrap();
    assert_eq!(hits.len(), 6);
    assert_eq!(hits[0].listing.name, "Service 7");

    let hits = engine
        .search_listings(SearchFilter {
            query: Some("service".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 8);
}

#[tokio::test]
async fn profile_shows_owner_location_and_catalog() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let vendor =
        approved_business(&engine, &admin, "parts@shop.test", Role::Vendor, "Spares Ltd").await;
    engine.add_listing(&vendor, listing("Spark plug", 50)).await.unwrap();

    let updated = engine
        .update_business_profile(
            &vendor,
            Some("  Genuine parts only "),
            Some("vendor_profiles/1_1.jpg".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("Genuine parts only"));

    let kept = engine
        .update_business_profile(&vendor, Some("Genuine parts"), None)
        .await
        .unwrap();
    assert_eq!(kept.image_path.as_deref(), Some("vendor_profiles/1_1.jpg"));

    let profile = engine.business_profile(vendor.business.unwrap()).await.unwrap();
    assert_eq!(profile.business.name, "Spares Ltd");
    assert_eq!(profile.owner_email, "parts@shop.test");
    assert_eq!(profile.city.as_deref(), Some("Nairobi"));
    assert_eq!(profile.district.as_deref(), Some("Westlands"));
    assert_eq!(profile.listings.len(), 1);
    assert_eq!(profile.average_rating, None);

    let owned = engine.business_by_owner(vendor.user_id).await.unwrap().unwrap();
    assert_eq!(owned.reference, vendor.business.unwrap());

    let dashboard = engine.business_dashboard(&vendor).await.unwrap();
    assert_eq!(dashboard.listing_count, 1);
    assert!(dashboard.recent_orders.is_empty());
}

#[tokio::test]
async fn admin_moderates_recent_listings() {
    let engine = engine_with_db().await;
    let admin = admin(&engine).await;
    let garage =
        approved_business(&engine, &admin, "fix@garage.test", Role::Garage, "Fix It").await;
    let vendor =
        approved_business(&engine, &admin, "parts@shop.test", Role::Vendor, "Spares Ltd").await;
    let service = engine.add_listing(&garage, listing("Wash", 10)).await.unwrap();
    engine.add_listing(&vendor, listing("Wiper", 20)).await.unwrap();

    let recent = engine.recent_listings(&admin).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().any(|l| l.business_name == "Fix It"));

    let err = engine.recent_listings(&garage).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .admin_delete_listing(&admin, service.reference)
        .await
        .unwrap();
    let err = engine
        .admin_delete_listing(&admin, service.reference)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(engine.recent_listings(&admin).await.unwrap().len(), 1);
}
