//! Admin panel: business approvals and listing moderation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    ApprovalState, EngineError, Listing, ListingRef, Principal, ResultEngine, Role,
    parts, roles, services, sessions, user_roles, users,
};

use super::{
    Engine, businesses_by_ref, find_business_by_owner, listings::delete_listing_row, with_tx,
};

/// Newest listings per kind shown on the moderation view.
pub const RECENT_LISTINGS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingBusiness {
    pub user_id: i32,
    pub email: String,
    pub contact: String,
    pub role: Role,
    pub business_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminListing {
    pub listing: Listing,
    pub business_name: String,
}

impl Engine {
    /// Garage and vendor accounts waiting for a decision, oldest first.
    pub async fn pending_businesses(
        &self,
        principal: &Principal,
    ) -> ResultEngine<Vec<PendingBusiness>> {
        principal.require_role(Role::Admin)?;
        let pending = users::Entity::find()
            .filter(users::Column::Approval.eq(ApprovalState::Pending.as_str()))
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?;
        let roles = roles_of(&self.database, pending.iter().map(|u| u.id).collect()).await?;

        let mut out = Vec::new();
        for user in pending {
            let Some(kind) = roles.get(&user.id).and_then(|role| role.business_kind()) else {
                continue;
            };
            let business_name = find_business_by_owner(&self.database, user.id, kind)
                .await?
                .map(|business| business.name);
            out.push(PendingBusiness {
                user_id: user.id,
                email: user.email,
                contact: user.contact,
                role: kind.role(),
                business_name,
                created_at: user.created_at,
            });
        }
        Ok(out)
    }

    /// Approves or rejects a garage or vendor account. Rejection also ends
    /// the target's open sessions.
    pub async fn set_approval(
        &self,
        principal: &Principal,
        target_user_id: i32,
        state: ApprovalState,
    ) -> ResultEngine<()> {
        principal.require_role(Role::Admin)?;
        if state == ApprovalState::Pending {
            return Err(EngineError::Validation(
                "approval must be Approved or Rejected".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let is_business = roles_of(&db_tx, vec![target_user_id])
                .await?
                .get(&target_user_id)
                .is_some_and(|role| role.is_business());
            if !is_business {
                return Err(EngineError::NotFound(format!(
                    "business account {target_user_id}"
                )));
            }

            users::ActiveModel {
                id: ActiveValue::Unchanged(target_user_id),
                approval: ActiveValue::Set(state.as_str().to_string()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            if state == ApprovalState::Rejected {
                sessions::Entity::delete_many()
                    .filter(sessions::Column::UserId.eq(target_user_id))
                    .exec(&db_tx)
                    .await?;
            }
            Ok(())
        })?;
        tracing::info!(
            admin_id = principal.user_id,
            target_user_id,
            state = state.as_str(),
            "approval changed"
        );
        Ok(())
    }

    /// The newest services and parts with the name of their business.
    pub async fn recent_listings(&self, principal: &Principal) -> ResultEngine<Vec<AdminListing>> {
        principal.require_role(Role::Admin)?;
        let mut listings: Vec<Listing> = services::Entity::find()
            .order_by_desc(services::Column::Id)
            .limit(RECENT_LISTINGS)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Listing::from)
            .collect();
        listings.extend(
            parts::Entity::find()
                .order_by_desc(parts::Column::Id)
                .limit(RECENT_LISTINGS)
                .all(&self.database)
                .await?
                .into_iter()
                .map(Listing::from),
        );

        let businesses =
            businesses_by_ref(&self.database, listings.iter().map(|l| l.business)).await?;
        Ok(listings
            .into_iter()
            .map(|listing| AdminListing {
                business_name: businesses
                    .get(&listing.business)
                    .map(|b| b.name.clone())
                    .unwrap_or_default(),
                listing,
            })
            .collect())
    }

    /// Removes any listing regardless of owner.
    pub async fn admin_delete_listing(
        &self,
        principal: &Principal,
        listing: ListingRef,
    ) -> ResultEngine<()> {
        principal.require_role(Role::Admin)?;
        delete_listing_row(&self.database, listing).await?;
        tracing::info!(
            admin_id = principal.user_id,
            listing_id = listing.id,
            kind = listing.kind.as_str(),
            "listing removed by admin"
        );
        Ok(())
    }
}

/// Role held by each of `user_ids`.
async fn roles_of<C: ConnectionTrait>(
    db: &C,
    user_ids: Vec<i32>,
) -> ResultEngine<HashMap<i32, Role>> {
    let names: HashMap<i32, String> = roles::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|role| (role.id, role.name))
        .collect();
    let mut out = HashMap::new();
    for link in user_roles::Entity::find()
        .filter(user_roles::Column::UserId.is_in(user_ids))
        .all(db)
        .await?
    {
        if let Some(name) = names.get(&link.role_id) {
            out.insert(link.user_id, Role::try_from(name.as_str())?);
        }
    }
    Ok(out)
}
