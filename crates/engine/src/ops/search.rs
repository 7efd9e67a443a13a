//! Customer marketplace search over services and parts.

use std::collections::HashMap;

use sea_orm::{
    Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*,
    sea_query::{Expr, Func, IntoColumnRef, SimpleExpr},
};

use crate::{
    Business, BusinessKind, Listing, ResultEngine, garages, locations, parts, services, vendors,
};

use super::{Engine, normalize_optional_text};

/// Rows per business kind when a filter is given.
pub const SEARCH_LIMIT: u64 = 20;
/// Rows per business kind on the unfiltered home view.
pub const HOME_LIMIT: u64 = 6;

#[derive(Clone, Debug, Default)]
pub struct SearchFilter {
    /// Matched against item and business names.
    pub query: Option<String>,
    /// Matched against item names only.
    pub category: Option<String>,
    pub target: Option<BusinessKind>,
}

impl SearchFilter {
    fn is_empty(&self) -> bool {
        self.query.is_none() && self.category.is_none() && self.target.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub listing: Listing,
    pub business_name: String,
    pub business_owner_user_id: i32,
    pub city: Option<String>,
}

/// Case-insensitive `LIKE %needle%`.
fn contains_ci(column: impl IntoColumnRef, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.to_lowercase()))
}

impl Engine {
    /// Garage hits come before vendor hits, each newest first.
    pub async fn search_listings(&self, filter: SearchFilter) -> ResultEngine<Vec<SearchHit>> {
        let filter = SearchFilter {
            query: normalize_optional_text(filter.query.as_deref()),
            category: normalize_optional_text(filter.category.as_deref()),
            target: filter.target,
        };
        let limit = if filter.is_empty() {
            HOME_LIMIT
        } else {
            SEARCH_LIMIT
        };

        let mut hits = Vec::new();
        if filter.target != Some(BusinessKind::Vendor) {
            hits.extend(self.search_services(&filter, limit).await?);
        }
        if filter.target != Some(BusinessKind::Garage) {
            hits.extend(self.search_parts(&filter, limit).await?);
        }
        Ok(hits)
    }

    async fn search_services(
        &self,
        filter: &SearchFilter,
        limit: u64,
    ) -> ResultEngine<Vec<SearchHit>> {
        let mut condition = Condition::all();
        if let Some(query) = &filter.query {
            let garage_ids: Vec<i32> = garages::Entity::find()
                .filter(contains_ci(garages::Column::Name, query))
                .all(&self.database)
                .await?
                .into_iter()
                .map(|garage| garage.id)
                .collect();
            condition = condition.add(
                Condition::any()
                    .add(contains_ci(services::Column::Name, query))
                    .add(services::Column::GarageId.is_in(garage_ids)),
            );
        }
        if let Some(category) = &filter.category {
            condition = condition.add(contains_ci(services::Column::Name, category));
        }

        let listings: Vec<Listing> = services::Entity::find()
            .filter(condition)
            .order_by_desc(services::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Listing::from)
            .collect();
        let ids: Vec<i32> = listings.iter().map(|l| l.business.id).collect();
        let owners = garages::Entity::find()
            .filter(garages::Column::Id.is_in(ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(Business::from);
        self.attach_business(listings, owners).await
    }

    async fn search_parts(
        &self,
        filter: &SearchFilter,
        limit: u64,
    ) -> ResultEngine<Vec<SearchHit>> {
        let mut condition = Condition::all();
        if let Some(query) = &filter.query {
            let vendor_ids: Vec<i32> = vendors::Entity::find()
                .filter(contains_ci(vendors::Column::Name, query))
                .all(&self.database)
                .await?
                .into_iter()
                .map(|vendor| vendor.id)
                .collect();
            condition = condition.add(
                Condition::any()
                    .add(contains_ci(parts::Column::Name, query))
                    .add(parts::Column::VendorId.is_in(vendor_ids)),
            );
        }
        if let Some(category) = &filter.category {
            condition = condition.add(contains_ci(parts::Column::Name, category));
        }

        let listings: Vec<Listing> = parts::Entity::find()
            .filter(condition)
            .order_by_desc(parts::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Listing::from)
            .collect();
        let ids: Vec<i32> = listings.iter().map(|l| l.business.id).collect();
        let owners = vendors::Entity::find()
            .filter(vendors::Column::Id.is_in(ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(Business::from);
        self.attach_business(listings, owners).await
    }

    async fn attach_business(
        &self,
        listings: Vec<Listing>,
        owners: impl Iterator<Item = Business>,
    ) -> ResultEngine<Vec<SearchHit>> {
        let owners: HashMap<i32, Business> = owners.map(|b| (b.reference.id, b)).collect();
        let location_ids: Vec<i32> = owners.values().filter_map(|b| b.location_id).collect();
        let cities: HashMap<i32, String> = locations::Entity::find()
            .filter(locations::Column::Id.is_in(location_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|location| (location.id, location.city))
            .collect();

        Ok(listings
            .into_iter()
            .filter_map(|listing| {
                let owner = owners.get(&listing.business.id)?;
                Some(SearchHit {
                    business_name: owner.name.clone(),
                    business_owner_user_id: owner.owner_user_id,
                    city: owner.location_id.and_then(|id| cities.get(&id).cloned()),
                    listing,
                })
            })
            .collect())
    }
}
