//! Service and part CRUD, always scoped to the caller's own business.

use std::collections::HashMap;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    BusinessKind, BusinessRef, EngineError, Listing, ListingInput, ListingKind, ListingRef,
    Principal, ResultEngine, parts, services,
};

use super::{Engine, normalize_optional_text, normalize_required, with_tx};

/// Validated listing fields.
struct CleanInput {
    name: String,
    price: i64,
    description: Option<String>,
    image_path: Option<String>,
}

impl TryFrom<ListingInput> for CleanInput {
    type Error = EngineError;

    fn try_from(input: ListingInput) -> Result<Self, Self::Error> {
        let name = normalize_required(&input.name, "name")?;
        if !input.price.is_positive() {
            return Err(EngineError::Validation(
                "price must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            name,
            price: input.price.cents(),
            description: normalize_optional_text(input.description.as_deref()),
            image_path: normalize_optional_text(input.image_path.as_deref()),
        })
    }
}

fn not_found(kind: ListingKind, id: i32) -> EngineError {
    EngineError::NotFound(format!("{} {id}", kind.as_str()))
}

impl Engine {
    /// Adds a service (garage) or part (vendor) to the caller's catalog.
    pub async fn add_listing(
        &self,
        principal: &Principal,
        input: ListingInput,
    ) -> ResultEngine<Listing> {
        let business = principal.require_business(None)?;
        let input = CleanInput::try_from(input)?;
        let listing = match business.kind {
            BusinessKind::Garage => Listing::from(
                services::ActiveModel {
                    name: ActiveValue::Set(input.name),
                    price: ActiveValue::Set(input.price),
                    garage_id: ActiveValue::Set(business.id),
                    description: ActiveValue::Set(input.description),
                    image_path: ActiveValue::Set(input.image_path),
                    ..Default::default()
                }
                .insert(&self.database)
                .await?,
            ),
            BusinessKind::Vendor => Listing::from(
                parts::ActiveModel {
                    name: ActiveValue::Set(input.name),
                    price: ActiveValue::Set(input.price),
                    vendor_id: ActiveValue::Set(business.id),
                    description: ActiveValue::Set(input.description),
                    image_path: ActiveValue::Set(input.image_path),
                    ..Default::default()
                }
                .insert(&self.database)
                .await?,
            ),
        };
        tracing::info!(
            business_id = business.id,
            listing_id = listing.reference.id,
            kind = listing.reference.kind.as_str(),
            "listing added"
        );
        Ok(listing)
    }

    /// Replaces name, price and description. `input.image_path = None`
    /// keeps the current image.
    pub async fn edit_listing(
        &self,
        principal: &Principal,
        listing_id: i32,
        input: ListingInput,
    ) -> ResultEngine<Listing> {
        let business = principal.require_business(None)?;
        let input = CleanInput::try_from(input)?;
        with_tx!(self, |db_tx| {
            let current = find_owned(&db_tx, business, listing_id).await?;
            let image_path = input.image_path.or(current.image_path);
            let listing = match business.kind {
                BusinessKind::Garage => Listing::from(
                    services::ActiveModel {
                        id: ActiveValue::Unchanged(listing_id),
                        name: ActiveValue::Set(input.name),
                        price: ActiveValue::Set(input.price),
                        description: ActiveValue::Set(input.description),
                        image_path: ActiveValue::Set(image_path),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?,
                ),
                BusinessKind::Vendor => Listing::from(
                    parts::ActiveModel {
                        id: ActiveValue::Unchanged(listing_id),
                        name: ActiveValue::Set(input.name),
                        price: ActiveValue::Set(input.price),
                        description: ActiveValue::Set(input.description),
                        image_path: ActiveValue::Set(image_path),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?,
                ),
            };
            Ok(listing)
        })
    }

    /// Points a listing at a new image and returns the previous path.
    pub async fn set_listing_image(
        &self,
        principal: &Principal,
        listing_id: i32,
        image_path: &str,
    ) -> ResultEngine<Option<String>> {
        let business = principal.require_business(None)?;
        let image_path = Some(image_path.to_string());
        with_tx!(self, |db_tx| {
            let current = find_owned(&db_tx, business, listing_id).await?;
            match business.kind {
                BusinessKind::Garage => {
                    services::ActiveModel {
                        id: ActiveValue::Unchanged(listing_id),
                        image_path: ActiveValue::Set(image_path),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?;
                }
                BusinessKind::Vendor => {
                    parts::ActiveModel {
                        id: ActiveValue::Unchanged(listing_id),
                        image_path: ActiveValue::Set(image_path),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?;
                }
            }
            Ok(current.image_path)
        })
    }

    /// Deletes one of the caller's listings and returns it. Transactions
    /// that referenced it keep their amount and lose the item link.
    pub async fn delete_listing(
        &self,
        principal: &Principal,
        listing_id: i32,
    ) -> ResultEngine<Listing> {
        let business = principal.require_business(None)?;
        let listing = with_tx!(self, |db_tx| {
            let current = find_owned(&db_tx, business, listing_id).await?;
            delete_listing_row(&db_tx, current.reference).await?;
            Ok(current)
        })?;
        tracing::info!(
            business_id = business.id,
            listing_id,
            kind = listing.reference.kind.as_str(),
            "listing deleted"
        );
        Ok(listing)
    }

    /// Catalog of one business, newest first.
    pub async fn listings_for(&self, business: BusinessRef) -> ResultEngine<Vec<Listing>> {
        Ok(match business.kind {
            BusinessKind::Garage => services::Entity::find()
                .filter(services::Column::GarageId.eq(business.id))
                .order_by_desc(services::Column::Id)
                .all(&self.database)
                .await?
                .into_iter()
                .map(Listing::from)
                .collect(),
            BusinessKind::Vendor => parts::Entity::find()
                .filter(parts::Column::VendorId.eq(business.id))
                .order_by_desc(parts::Column::Id)
                .all(&self.database)
                .await?
                .into_iter()
                .map(Listing::from)
                .collect(),
        })
    }

    /// One of the caller's own listings.
    pub async fn listing(&self, principal: &Principal, listing_id: i32) -> ResultEngine<Listing> {
        let business = principal.require_business(None)?;
        find_owned(&self.database, business, listing_id).await
    }
}

/// Loads a listing only when it belongs to `business`.
async fn find_owned<C: ConnectionTrait>(
    db: &C,
    business: BusinessRef,
    listing_id: i32,
) -> ResultEngine<Listing> {
    let kind = business.kind.listing_kind();
    let found = match kind {
        ListingKind::Service => services::Entity::find_by_id(listing_id)
            .filter(services::Column::GarageId.eq(business.id))
            .one(db)
            .await?
            .map(Listing::from),
        ListingKind::Part => parts::Entity::find_by_id(listing_id)
            .filter(parts::Column::VendorId.eq(business.id))
            .one(db)
            .await?
            .map(Listing::from),
    };
    found.ok_or_else(|| not_found(kind, listing_id))
}

pub(super) async fn delete_listing_row<C: ConnectionTrait>(
    db: &C,
    reference: ListingRef,
) -> ResultEngine<()> {
    let result = match reference.kind {
        ListingKind::Service => services::Entity::delete_by_id(reference.id).exec(db).await?,
        ListingKind::Part => parts::Entity::delete_by_id(reference.id).exec(db).await?,
    };
    if result.rows_affected == 0 {
        return Err(not_found(reference.kind, reference.id));
    }
    Ok(())
}

/// Names of the given listings. Deleted listings are simply absent.
pub(super) async fn listing_names<C: ConnectionTrait>(
    db: &C,
    refs: impl IntoIterator<Item = ListingRef>,
) -> ResultEngine<HashMap<ListingRef, String>> {
    let mut service_ids = Vec::new();
    let mut part_ids = Vec::new();
    for reference in refs {
        match reference.kind {
            ListingKind::Service => service_ids.push(reference.id),
            ListingKind::Part => part_ids.push(reference.id),
        }
    }

    let mut out = HashMap::new();
    if !service_ids.is_empty() {
        for model in services::Entity::find()
            .filter(services::Column::Id.is_in(service_ids))
            .all(db)
            .await?
        {
            let listing = Listing::from(model);
            out.insert(listing.reference, listing.name);
        }
    }
    if !part_ids.is_empty() {
        for model in parts::Entity::find()
            .filter(parts::Column::Id.is_in(part_ids))
            .all(db)
            .await?
        {
            let listing = Listing::from(model);
            out.insert(listing.reference, listing.name);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MoneyCents;

    #[test]
    fn input_requires_name_and_positive_price() {
        let ok = CleanInput::try_from(ListingInput {
            name: "  Oil change ".to_string(),
            price: MoneyCents::from_units(2_500),
            description: Some("   ".to_string()),
            image_path: None,
        })
        .unwrap();
        assert_eq!(ok.name, "Oil change");
        assert_eq!(ok.price, 250_000);
        assert_eq!(ok.description, None);

        assert!(
            CleanInput::try_from(ListingInput {
                name: " ".to_string(),
                price: MoneyCents::from_units(1),
                ..Default::default()
            })
            .is_err()
        );
        assert!(
            CleanInput::try_from(ListingInput {
                name: "Brake pads".to_string(),
                price: MoneyCents::ZERO,
                ..Default::default()
            })
            .is_err()
        );
    }
}
