//! Ledger entries: one row per order a customer places with a business.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{BusinessRef, EngineError, ListingKind, ListingRef, MoneyCents};

/// Pending --finalize--> Completed. `Cancelled` is terminal and never
/// produced by the engine today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub initiator_user_id: i32,
    pub service_id: Option<i32>,
    pub part_id: Option<i32>,
    pub target_garage_id: Option<i32>,
    pub target_vendor_id: Option<i32>,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Typed view of a `transactions` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i32,
    pub initiator_user_id: i32,
    /// `None` once the listing has been deleted.
    pub item: Option<ListingRef>,
    pub business: Option<BusinessRef>,
    pub amount: MoneyCents,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn item_kind(&self) -> Option<ListingKind> {
        self.item
            .map(|item| item.kind)
            .or_else(|| self.business.map(|b| b.kind.listing_kind()))
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let item = match (model.service_id, model.part_id) {
            (Some(id), _) => Some(ListingRef {
                kind: ListingKind::Service,
                id,
            }),
            (None, Some(id)) => Some(ListingRef {
                kind: ListingKind::Part,
                id,
            }),
            (None, None) => None,
        };
        let business = match (model.target_garage_id, model.target_vendor_id) {
            (Some(id), _) => Some(BusinessRef::garage(id)),
            (None, Some(id)) => Some(BusinessRef::vendor(id)),
            (None, None) => None,
        };
        Ok(Self {
            id: model.id,
            initiator_user_id: model.initiator_user_id,
            item,
            business,
            amount: MoneyCents::new(model.amount),
            status: TransactionStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}
