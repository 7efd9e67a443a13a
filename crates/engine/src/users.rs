//! Principals (`users` table) and their approval state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents};

/// Admin gate on business accounts.
///
/// Customers and admins are approved at creation; garages and vendors start
/// `Pending` until an admin decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl TryFrom<&str> for ApprovalState {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid approval state: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub contact: String,
    pub location_id: Option<i32>,
    pub account_balance: i64,
    pub approval: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn balance(&self) -> MoneyCents {
        MoneyCents::new(self.account_balance)
    }

    pub fn approval_state(&self) -> Result<ApprovalState, EngineError> {
        ApprovalState::try_from(self.approval.as_str())
    }

    /// Local part of the email, used when no business name is available.
    pub fn display_name(&self) -> String {
        self.email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Normalizes an email for storage and lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
