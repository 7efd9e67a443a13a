use std::collections::HashMap;

use chrono::Duration;
use sea_orm::{DatabaseConnection, QueryFilter, prelude::*};

use crate::{
    Business, BusinessKind, BusinessRef, EngineError, MoneyCents, ResultEngine, garages, vendors,
};

mod admin;
mod auth;
mod business;
mod history;
mod ledger;
mod listings;
mod messages;
mod ratings;
mod registration;
mod search;
mod sessions;

pub use admin::{AdminListing, PendingBusiness};
pub use business::{BusinessDashboard, BusinessProfile};
pub use history::{BusinessOrder, CustomerHistoryEntry};
pub use ledger::{Finalized, OrderRequest};
pub use messages::{ConversationMessage, MessageThread};
pub use registration::NewRegistration;
pub use search::{SearchFilter, SearchHit};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The block is evaluated as an `async` block, so `?` and `return` leave the
/// block (not the calling function) and the rollback always runs.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = async { $body }.await;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::error!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

/// Opening balance credited to every new customer (10000.00).
pub const DEFAULT_CUSTOMER_OPENING_BALANCE: MoneyCents = MoneyCents::from_units(10_000);

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    customer_opening_balance: MoneyCents,
    session_ttl: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }
}

fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Loads one garage or vendor row.
async fn find_business<C: ConnectionTrait>(
    db: &C,
    reference: BusinessRef,
) -> ResultEngine<Option<Business>> {
    Ok(match reference.kind {
        BusinessKind::Garage => garages::Entity::find_by_id(reference.id)
            .one(db)
            .await?
            .map(Business::from),
        BusinessKind::Vendor => vendors::Entity::find_by_id(reference.id)
            .one(db)
            .await?
            .map(Business::from),
    })
}

async fn require_business<C: ConnectionTrait>(
    db: &C,
    reference: BusinessRef,
) -> ResultEngine<Business> {
    find_business(db, reference)
        .await?
        .ok_or_else(|| {
            EngineError::NotFound(format!("{} {}", reference.kind.as_str(), reference.id))
        })
}

/// The business owned by `user_id`, if any.
async fn find_business_by_owner<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    kind: BusinessKind,
) -> ResultEngine<Option<Business>> {
    Ok(match kind {
        BusinessKind::Garage => garages::Entity::find()
            .filter(garages::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(Business::from),
        BusinessKind::Vendor => vendors::Entity::find()
            .filter(vendors::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(Business::from),
    })
}

/// Bulk lookup of businesses, keyed by reference.
async fn businesses_by_ref<C: ConnectionTrait>(
    db: &C,
    refs: impl IntoIterator<Item = BusinessRef>,
) -> ResultEngine<HashMap<BusinessRef, Business>> {
    let mut garage_ids = Vec::new();
    let mut vendor_ids = Vec::new();
    for reference in refs {
        match reference.kind {
            BusinessKind::Garage => garage_ids.push(reference.id),
            BusinessKind::Vendor => vendor_ids.push(reference.id),
        }
    }

    let mut out = HashMap::new();
    if !garage_ids.is_empty() {
        for model in garages::Entity::find()
            .filter(garages::Column::Id.is_in(garage_ids))
            .all(db)
            .await?
        {
            let business = Business::from(model);
            out.insert(business.reference, business);
        }
    }
    if !vendor_ids.is_empty() {
        for model in vendors::Entity::find()
            .filter(vendors::Column::Id.is_in(vendor_ids))
            .all(db)
            .await?
        {
            let business = Business::from(model);
            out.insert(business.reference, business);
        }
    }
    Ok(out)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    customer_opening_balance: MoneyCents,
    session_ttl: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            customer_opening_balance: DEFAULT_CUSTOMER_OPENING_BALANCE,
            session_ttl: Duration::hours(12),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Balance credited to customers at registration.
    pub fn customer_opening_balance(mut self, amount: MoneyCents) -> EngineBuilder {
        self.customer_opening_balance = amount;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.session_ttl = ttl;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.customer_opening_balance.cents() < 0 {
            return Err(EngineError::InvalidAmount(
                "opening balance must not be negative".to_string(),
            ));
        }
        if self.session_ttl <= Duration::zero() {
            return Err(EngineError::Validation(
                "session ttl must be positive".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            customer_opening_balance: self.customer_opening_balance,
            session_ttl: self.session_ttl,
        })
    }
}
