use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, SqlErr, TransactionTrait, prelude::*};

use crate::{
    BusinessKind, EngineError, LedgerEntry, Principal, ResultEngine, Role, TransactionStatus,
    ratings, transactions,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Rates one of the caller's completed transactions (value 1..=5).
    /// A transaction can be rated once.
    pub async fn rate_transaction(
        &self,
        principal: &Principal,
        transaction_id: i32,
        value: i32,
        comment: Option<&str>,
    ) -> ResultEngine<ratings::Model> {
        principal.require_role(Role::Customer)?;
        if !(1..=5).contains(&value) {
            return Err(EngineError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        let comment = normalize_optional_text(comment);

        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id)
                .filter(transactions::Column::InitiatorUserId.eq(principal.user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("transaction {transaction_id}")))?;
            let entry = LedgerEntry::try_from(model)?;
            if entry.status != TransactionStatus::Completed {
                return Err(EngineError::InvalidState(
                    "only completed transactions can be rated".to_string(),
                ));
            }

            let (garage_id, vendor_id) = match entry.business {
                Some(b) if b.kind == BusinessKind::Garage => (Some(b.id), None),
                Some(b) => (None, Some(b.id)),
                None => (None, None),
            };
            ratings::ActiveModel {
                transaction_id: ActiveValue::Set(transaction_id),
                user_id: ActiveValue::Set(principal.user_id),
                garage_id: ActiveValue::Set(garage_id),
                vendor_id: ActiveValue::Set(vendor_id),
                value: ActiveValue::Set(value),
                comment: ActiveValue::Set(comment),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => EngineError::InvalidState(
                    "transaction already rated".to_string(),
                ),
                _ => EngineError::Database(err),
            })
        })
    }
}
