//! Garage and vendor profiles, handled through [`BusinessRef`].

use chrono::{Duration, Utc};
use sea_orm::{ActiveValue, PaginatorTrait, QueryFilter, prelude::*};

use crate::{
    Business, BusinessKind, BusinessRef, Listing, Principal, ResultEngine, TransactionStatus,
    garages, locations, parts, ratings, services, transactions, users, vendors,
};

use super::{
    BusinessOrder, Engine, find_business_by_owner, normalize_optional_text, require_business,
};

/// Public profile page of a business.
#[derive(Clone, Debug, PartialEq)]
pub struct BusinessProfile {
    pub business: Business,
    pub owner_email: String,
    pub contact: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub average_rating: Option<f64>,
    pub listings: Vec<Listing>,
}

/// Figures shown on a garage or vendor dashboard.
#[derive(Clone, Debug, PartialEq)]
pub struct BusinessDashboard {
    pub business: Business,
    pub listing_count: u64,
    pub orders_last_7_days: u64,
    pub pending_orders: u64,
    pub average_rating: Option<f64>,
    pub recent_orders: Vec<BusinessOrder>,
}

impl Engine {
    /// The garage or vendor owned by `user_id`, if any.
    pub async fn business_by_owner(&self, user_id: i32) -> ResultEngine<Option<Business>> {
        if let Some(garage) =
            find_business_by_owner(&self.database, user_id, BusinessKind::Garage).await?
        {
            return Ok(Some(garage));
        }
        find_business_by_owner(&self.database, user_id, BusinessKind::Vendor).await
    }

    pub async fn business_profile(&self, reference: BusinessRef) -> ResultEngine<BusinessProfile> {
        let business = require_business(&self.database, reference).await?;
        let owner = users::Entity::find_by_id(business.owner_user_id)
            .one(&self.database)
            .await?;
        let location = match business.location_id {
            Some(id) => locations::Entity::find_by_id(id).one(&self.database).await?,
            None => None,
        };
        let listings = self.listings_for(reference).await?;
        let average_rating = self.average_rating(reference).await?;

        Ok(BusinessProfile {
            owner_email: owner.as_ref().map(|u| u.email.clone()).unwrap_or_default(),
            contact: owner.map(|u| u.contact).unwrap_or_default(),
            city: location.as_ref().map(|l| l.city.clone()),
            district: location.map(|l| l.district),
            average_rating,
            listings,
            business,
        })
    }

    /// Updates the caller's own business. `image_path = None` keeps the
    /// current image; an empty description clears it.
    pub async fn update_business_profile(
        &self,
        principal: &Principal,
        description: Option<&str>,
        image_path: Option<String>,
    ) -> ResultEngine<Business> {
        let reference = principal.require_business(None)?;
        require_business(&self.database, reference).await?;
        let description = ActiveValue::Set(normalize_optional_text(description));
        let image_path = match image_path {
            Some(path) => ActiveValue::Set(Some(path)),
            None => ActiveValue::NotSet,
        };

        let updated = match reference.kind {
            BusinessKind::Garage => Business::from(
                garages::ActiveModel {
                    id: ActiveValue::Unchanged(reference.id),
                    description,
                    image_path,
                    ..Default::default()
                }
                .update(&self.database)
                .await?,
            ),
            BusinessKind::Vendor => Business::from(
                vendors::ActiveModel {
                    id: ActiveValue::Unchanged(reference.id),
                    description,
                    image_path,
                    ..Default::default()
                }
                .update(&self.database)
                .await?,
            ),
        };
        tracing::info!(
            business_id = reference.id,
            kind = reference.kind.as_str(),
            "business profile updated"
        );
        Ok(updated)
    }

    pub async fn business_dashboard(
        &self,
        principal: &Principal,
    ) -> ResultEngine<BusinessDashboard> {
        let reference = principal.require_business(None)?;
        let business = require_business(&self.database, reference).await?;
        let target = match reference.kind {
            BusinessKind::Garage => transactions::Column::TargetGarageId,
            BusinessKind::Vendor => transactions::Column::TargetVendorId,
        };

        let listing_count = match reference.kind {
            BusinessKind::Garage => {
                services::Entity::find()
                    .filter(services::Column::GarageId.eq(reference.id))
                    .count(&self.database)
                    .await?
            }
            BusinessKind::Vendor => {
                parts::Entity::find()
                    .filter(parts::Column::VendorId.eq(reference.id))
                    .count(&self.database)
                    .await?
            }
        };
        let orders_last_7_days = transactions::Entity::find()
            .filter(target.eq(reference.id))
            .filter(transactions::Column::CreatedAt.gte(Utc::now() - Duration::days(7)))
            .count(&self.database)
            .await?;
        let pending_orders = transactions::Entity::find()
            .filter(target.eq(reference.id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .count(&self.database)
            .await?;
        let average_rating = self.average_rating(reference).await?;
        let recent_orders = self
            .orders_for(reference.kind, reference.id, None, Some(5))
            .await?;

        Ok(BusinessDashboard {
            business,
            listing_count,
            orders_last_7_days,
            pending_orders,
            average_rating,
            recent_orders,
        })
    }

    async fn average_rating(&self, reference: BusinessRef) -> ResultEngine<Option<f64>> {
        let column = match reference.kind {
            BusinessKind::Garage => ratings::Column::GarageId,
            BusinessKind::Vendor => ratings::Column::VendorId,
        };
        let values: Vec<i32> = ratings::Entity::find()
            .filter(column.eq(reference.id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|rating| rating.value)
            .collect();
        if values.is_empty() {
            return Ok(None);
        }
        let sum: i64 = values.iter().map(|v| i64::from(*v)).sum();
        Ok(Some(sum as f64 / values.len() as f64))
    }
}
