//! Read-only transaction lists for customers and businesses.

use std::collections::{HashMap, HashSet};

use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    BusinessKind, LedgerEntry, Principal, ResultEngine, TransactionStatus, ratings, transactions,
    users,
};

use super::{Engine, businesses_by_ref, listings::listing_names};

/// One row of a customer's purchase history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerHistoryEntry {
    pub entry: LedgerEntry,
    pub business_name: Option<String>,
    pub item_name: Option<String>,
    /// Lets the customer message the business from the history view.
    pub business_owner_user_id: Option<i32>,
    pub has_rated: bool,
}

/// An order as seen by the garage or vendor that received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusinessOrder {
    pub entry: LedgerEntry,
    pub customer_email: String,
    pub item_name: Option<String>,
}

impl Engine {
    /// Transactions initiated by `user_id`, newest first.
    pub async fn customer_history(&self, user_id: i32) -> ResultEngine<Vec<CustomerHistoryEntry>> {
        let entries = transactions::Entity::find()
            .filter(transactions::Column::InitiatorUserId.eq(user_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let businesses =
            businesses_by_ref(&self.database, entries.iter().filter_map(|e| e.business)).await?;
        let names = listing_names(&self.database, entries.iter().filter_map(|e| e.item)).await?;
        let rated: HashSet<i32> = ratings::Entity::find()
            .filter(ratings::Column::TransactionId.is_in(entries.iter().map(|e| e.id)))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|rating| rating.transaction_id)
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| {
                let business = entry.business.and_then(|b| businesses.get(&b));
                CustomerHistoryEntry {
                    business_name: business.map(|b| b.name.clone()),
                    business_owner_user_id: business.map(|b| b.owner_user_id),
                    item_name: entry.item.and_then(|i| names.get(&i).cloned()),
                    has_rated: rated.contains(&entry.id),
                    entry,
                }
            })
            .collect())
    }

    /// Orders received by the caller's business, newest first, optionally
    /// restricted to one status.
    pub async fn business_transactions(
        &self,
        principal: &Principal,
        status: Option<TransactionStatus>,
    ) -> ResultEngine<Vec<BusinessOrder>> {
        let business = principal.require_business(None)?;
        self.orders_for(business.kind, business.id, status, None).await
    }

    pub(super) async fn orders_for(
        &self,
        kind: BusinessKind,
        business_id: i32,
        status: Option<TransactionStatus>,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<BusinessOrder>> {
        let target = match kind {
            BusinessKind::Garage => transactions::Column::TargetGarageId,
            BusinessKind::Vendor => transactions::Column::TargetVendorId,
        };
        let mut query = transactions::Entity::find().filter(target.eq(business_id));
        if let Some(status) = status {
            query = query.filter(transactions::Column::Status.eq(status.as_str()));
        }
        let entries = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let customer_ids: HashSet<i32> = entries.iter().map(|e| e.initiator_user_id).collect();
        let emails: HashMap<i32, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(customer_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|user| (user.id, user.email))
            .collect();
        let names = listing_names(&self.database, entries.iter().filter_map(|e| e.item)).await?;

        Ok(entries
            .into_iter()
            .map(|entry| BusinessOrder {
                customer_email: emails
                    .get(&entry.initiator_user_id)
                    .cloned()
                    .unwrap_or_default(),
                item_name: entry.item.and_then(|i| names.get(&i).cloned()),
                entry,
            })
            .collect())
    }
}
