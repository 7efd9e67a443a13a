//! Wallet ledger: balance, recharge, order request and finalize.

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QuerySelect, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    BusinessKind, BusinessRef, EngineError, LedgerEntry, ListingKind, ListingRef, MoneyCents,
    Principal, ResultEngine, Role, TransactionStatus, parts, services, transactions, users,
};

use super::{Engine, with_tx};

/// A customer's order for one listing of one business.
#[derive(Clone, Copy, Debug)]
pub struct OrderRequest {
    pub item: ListingRef,
    pub business: BusinessRef,
    /// Price the client displayed. Informational only.
    pub price_snapshot: Option<MoneyCents>,
}

/// Result of a successful finalize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finalized {
    pub entry: LedgerEntry,
    pub balance: MoneyCents,
}

impl Engine {
    /// The `users` row behind a principal.
    pub async fn account(&self, user_id: i32) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    /// Current wallet balance of `user_id`.
    pub async fn balance(&self, user_id: i32) -> ResultEngine<MoneyCents> {
        Ok(self.account(user_id).await?.balance())
    }

    /// Credits `amount` to the wallet and returns the new balance.
    pub async fn recharge(&self, user_id: i32, amount: MoneyCents) -> ResultEngine<MoneyCents> {
        let amount = amount.ensure_positive("recharge amount")?;
        let balance = with_tx!(self, |db_tx| {
            let user = users::Entity::find_by_id(user_id)
                .lock_exclusive()
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))?;
            if user.balance().checked_add(amount).is_none() {
                return Err(EngineError::InvalidAmount(
                    "recharge would overflow the balance".to_string(),
                ));
            }

            let result = users::Entity::update_many()
                .col_expr(
                    users::Column::AccountBalance,
                    Expr::col(users::Column::AccountBalance).add(amount.cents()),
                )
                .filter(users::Column::Id.eq(user_id))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::NotFound(format!("user {user_id}")));
            }
            read_balance(&db_tx, user_id).await
        })?;
        tracing::info!(user_id, %amount, %balance, "recharge");
        Ok(balance)
    }

    /// Records a `Pending` order. The amount is always the listing's current
    /// price; the wallet is not touched until [`Engine::finalize`].
    pub async fn request_order(
        &self,
        principal: &Principal,
        request: OrderRequest,
    ) -> ResultEngine<LedgerEntry> {
        principal.require_role(Role::Customer)?;
        if request.item.id <= 0 || request.business.id <= 0 {
            return Err(EngineError::Validation("invalid order reference".to_string()));
        }
        if request.item.kind.business_kind() != request.business.kind {
            return Err(EngineError::Validation(format!(
                "a {} cannot be ordered from a {}",
                request.item.kind.as_str(),
                request.business.kind.as_str()
            )));
        }
        if let Some(snapshot) = request.price_snapshot {
            if !snapshot.is_positive() {
                return Err(EngineError::Validation(
                    "price must be greater than zero".to_string(),
                ));
            }
        }

        let entry = with_tx!(self, |db_tx| {
            let price = listing_price(&db_tx, request.item, request.business).await?;
            if let Some(snapshot) = request.price_snapshot.filter(|s| *s != price) {
                tracing::warn!(
                    user_id = principal.user_id,
                    item = request.item.id,
                    %snapshot,
                    %price,
                    "client price differs from listing price, using listing price"
                );
            }

            let (service_id, part_id) = match request.item.kind {
                ListingKind::Service => (Some(request.item.id), None),
                ListingKind::Part => (None, Some(request.item.id)),
            };
            let (target_garage_id, target_vendor_id) = match request.business.kind {
                BusinessKind::Garage => (Some(request.business.id), None),
                BusinessKind::Vendor => (None, Some(request.business.id)),
            };
            let model = transactions::ActiveModel {
                initiator_user_id: ActiveValue::Set(principal.user_id),
                service_id: ActiveValue::Set(service_id),
                part_id: ActiveValue::Set(part_id),
                target_garage_id: ActiveValue::Set(target_garage_id),
                target_vendor_id: ActiveValue::Set(target_vendor_id),
                amount: ActiveValue::Set(price.cents()),
                status: ActiveValue::Set(TransactionStatus::Pending.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            LedgerEntry::try_from(model)
        })?;
        tracing::info!(
            transaction_id = entry.id,
            user_id = principal.user_id,
            amount = %entry.amount,
            "order requested"
        );
        Ok(entry)
    }

    /// Pays a pending order: debits the initiator and marks the transaction
    /// `Completed`, atomically.
    ///
    /// Both rows are read under an exclusive lock, and both writes are
    /// conditional (`balance >= amount`, `status = Pending`), so two
    /// concurrent finalizes can never overdraw nor pay twice.
    pub async fn finalize(
        &self,
        principal: &Principal,
        transaction_id: i32,
    ) -> ResultEngine<Finalized> {
        let user_id = principal.user_id;
        let finalized = with_tx!(self, |db_tx| {
            let tx_model = transactions::Entity::find_by_id(transaction_id)
                .filter(transactions::Column::InitiatorUserId.eq(user_id))
                .lock_exclusive()
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("transaction {transaction_id}")))?;
            let status = TransactionStatus::try_from(tx_model.status.as_str())?;
            if status != TransactionStatus::Pending {
                return Err(EngineError::InvalidState(format!(
                    "transaction {transaction_id} is {}",
                    status.as_str()
                )));
            }

            let user = users::Entity::find_by_id(user_id)
                .lock_exclusive()
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))?;
            let amount = MoneyCents::new(tx_model.amount);
            if user.balance() < amount {
                return Err(insufficient(user.balance(), amount));
            }

            let debit = users::Entity::update_many()
                .col_expr(
                    users::Column::AccountBalance,
                    Expr::col(users::Column::AccountBalance).sub(amount.cents()),
                )
                .filter(users::Column::Id.eq(user_id))
                .filter(users::Column::AccountBalance.gte(amount.cents()))
                .exec(&db_tx)
                .await?;
            if debit.rows_affected == 0 {
                return Err(insufficient(user.balance(), amount));
            }

            let completed = transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(TransactionStatus::Completed.as_str()),
                )
                .filter(transactions::Column::Id.eq(transaction_id))
                .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if completed.rows_affected == 0 {
                return Err(EngineError::InvalidState(format!(
                    "transaction {transaction_id} already finalized"
                )));
            }

            let balance = read_balance(&db_tx, user_id).await?;
            let entry = LedgerEntry {
                status: TransactionStatus::Completed,
                ..LedgerEntry::try_from(tx_model)?
            };
            Ok(Finalized { entry, balance })
        });

        match &finalized {
            Ok(done) => tracing::info!(
                transaction_id,
                user_id,
                amount = %done.entry.amount,
                balance = %done.balance,
                "transaction finalized"
            ),
            Err(err) => tracing::debug!(transaction_id, user_id, "finalize refused: {err}"),
        }
        finalized
    }
}

fn insufficient(balance: MoneyCents, amount: MoneyCents) -> EngineError {
    EngineError::InsufficientFunds(format!("balance {balance}, required {amount}"))
}

async fn read_balance<C: ConnectionTrait>(db: &C, user_id: i32) -> ResultEngine<MoneyCents> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .map(|user| user.balance())
        .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
}

/// Current price of `item`, which must belong to `business`.
async fn listing_price<C: ConnectionTrait>(
    db: &C,
    item: ListingRef,
    business: BusinessRef,
) -> ResultEngine<MoneyCents> {
    let price = match item.kind {
        ListingKind::Service => services::Entity::find_by_id(item.id)
            .filter(services::Column::GarageId.eq(business.id))
            .one(db)
            .await?
            .map(|model| model.price),
        ListingKind::Part => parts::Entity::find_by_id(item.id)
            .filter(parts::Column::VendorId.eq(business.id))
            .one(db)
            .await?
            .map(|model| model.price),
    };
    price.map(MoneyCents::new).ok_or_else(|| {
        EngineError::NotFound(format!(
            "{} {} of {} {}",
            item.kind.as_str(),
            item.id,
            business.kind.as_str(),
            business.id
        ))
    })
}
