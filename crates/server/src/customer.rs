//! Customer dashboard and wallet routes.

use api_types::{
    Flash,
    customer::{DashboardQuery, DashboardView, HistoryRowView, SearchHitView},
    transaction::{FinalizeForm, RateForm, RechargeForm, RequestForm},
};
use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use engine::{
    BusinessKind, BusinessRef, CustomerHistoryEntry, ListingKind, ListingRef, OrderRequest,
    Principal, Role, SearchFilter, SearchHit,
};

use crate::{
    ServerError, amount,
    forms::{non_blank, parse_amount, parse_id},
    redirect_outcome,
    server::ServerState,
};

const HISTORY_VIEW: &str = "/customer/dashboard?view=history";

fn search_hit_view(hit: SearchHit) -> SearchHitView {
    SearchHitView {
        item_type: hit.listing.reference.kind.as_str().to_string(),
        item_id: hit.listing.reference.id,
        item_name: hit.listing.name,
        price: amount(hit.listing.price),
        business_type: hit.listing.business.kind.as_str().to_string(),
        business_id: hit.listing.business.id,
        business_name: hit.business_name,
        business_user_id: hit.business_owner_user_id,
        city: hit.city,
    }
}

fn history_row_view(row: CustomerHistoryEntry) -> HistoryRowView {
    HistoryRowView {
        transaction_id: row.entry.id,
        item_type: row.entry.item_kind().map(|kind| kind.as_str().to_string()),
        item_name: row.item_name,
        business_name: row.business_name,
        business_user_id: row.business_owner_user_id,
        amount: amount(row.entry.amount),
        status: row.entry.status.as_str().to_string(),
        created_at: row.entry.created_at,
        has_rated: row.has_rated,
    }
}

/// Marketplace search by default, purchase history with `?view=history`
pub async fn dashboard(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<DashboardQuery>,
    Query(flash): Query<Flash>,
) -> Result<Json<DashboardView>, ServerError> {
    principal.require_role(Role::Customer)?;
    let account = state.engine.account(principal.user_id).await?;

    let show_history = query.view.as_deref() == Some("history");
    let (listings, history) = if show_history {
        let history = state.engine.customer_history(principal.user_id).await?;
        (Vec::new(), history.into_iter().map(history_row_view).collect())
    } else {
        let target = non_blank(query.target.as_deref())
            .map(BusinessKind::try_from)
            .transpose()?;
        let hits = state
            .engine
            .search_listings(SearchFilter {
                query: query.q,
                category: query.category,
                target,
            })
            .await?;
        (hits.into_iter().map(search_hit_view).collect(), Vec::new())
    };

    Ok(Json(DashboardView {
        balance: amount(account.balance()),
        email: account.email,
        view: if show_history { "history" } else { "marketplace" }.to_string(),
        listings,
        history,
        flash,
    }))
}

pub async fn request(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<RequestForm>,
) -> Redirect {
    redirect_outcome(HISTORY_VIEW, request_order(&state, &principal, form).await)
}

async fn request_order(
    state: &ServerState,
    principal: &Principal,
    form: RequestForm,
) -> Result<String, ServerError> {
    let item = ListingRef {
        kind: ListingKind::try_from(form.item_type.as_str())?,
        id: parse_id(&form.item_id, "item id")?,
    };
    let business = BusinessRef {
        kind: BusinessKind::try_from(form.business_type.as_str())?,
        id: parse_id(&form.business_id, "business id")?,
    };
    let price_snapshot = non_blank(form.price.as_deref())
        .map(parse_amount)
        .transpose()?;

    let entry = state
        .engine
        .request_order(
            principal,
            OrderRequest {
                item,
                business,
                price_snapshot,
            },
        )
        .await?;
    Ok(format!(
        "Request #{} for {} created. Finalize it to pay.",
        entry.id, entry.amount
    ))
}

pub async fn recharge(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<RechargeForm>,
) -> Redirect {
    let outcome = async {
        principal.require_role(Role::Customer)?;
        let amount = parse_amount(&form.amount)?;
        let balance = state.engine.recharge(principal.user_id, amount).await?;
        Ok::<_, ServerError>(format!("Wallet recharged. New balance: {balance}"))
    }
    .await;
    redirect_outcome(HISTORY_VIEW, outcome)
}

pub async fn finalize(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<FinalizeForm>,
) -> Redirect {
    let outcome = async {
        let transaction_id = parse_id(&form.transaction_id, "transaction id")?;
        let finalized = state.engine.finalize(&principal, transaction_id).await?;
        Ok::<_, ServerError>(format!(
            "Paid {} for transaction #{}. New balance: {}",
            finalized.entry.amount, finalized.entry.id, finalized.balance
        ))
    }
    .await;
    redirect_outcome(HISTORY_VIEW, outcome)
}

pub async fn rate(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<RateForm>,
) -> Redirect {
    let outcome = async {
        let transaction_id = parse_id(&form.transaction_id, "transaction id")?;
        let value = form
            .rating
            .trim()
            .parse::<i32>()
            .map_err(|_| ServerError::Generic("rating must be a number".to_string()))?;
        state
            .engine
            .rate_transaction(&principal, transaction_id, value, form.comment.as_deref())
            .await?;
        Ok::<_, ServerError>("Thank you for your rating.".to_string())
    }
    .await;
    redirect_outcome(HISTORY_VIEW, outcome)
}
