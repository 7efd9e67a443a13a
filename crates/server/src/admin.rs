//! Admin panel: pending approvals and listing moderation.

use api_types::{
    Flash,
    admin::{
        ApprovalForm, DashboardQuery, DashboardView, ListingDeleteForm, ListingRowView,
        PendingView,
    },
};
use axum::{
    Extension, Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use engine::{ApprovalState, ListingKind, ListingRef, Principal, Role};

use crate::{ServerError, amount, forms::parse_id, redirect_outcome, server::ServerState};

const PENDING_VIEW: &str = "/admin/dashboard?view=pending";
const LISTINGS_VIEW: &str = "/admin/dashboard?view=listings";

/// `?view=pending` (default) or `?view=listings`
pub async fn dashboard(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<DashboardQuery>,
    Query(flash): Query<Flash>,
) -> Result<Json<DashboardView>, ServerError> {
    principal.require_role(Role::Admin)?;

    let mut view = DashboardView {
        view: "pending".to_string(),
        pending: Vec::new(),
        listings: Vec::new(),
        flash,
    };
    if query.view.as_deref() == Some("listings") {
        view.view = "listings".to_string();
        view.listings = state
            .engine
            .recent_listings(&principal)
            .await?
            .into_iter()
            .map(|row| ListingRowView {
                item_type: row.listing.reference.kind.as_str().to_string(),
                item_id: row.listing.reference.id,
                name: row.listing.name,
                price: amount(row.listing.price),
                business_name: row.business_name,
            })
            .collect();
    } else {
        view.pending = state
            .engine
            .pending_businesses(&principal)
            .await?
            .into_iter()
            .map(|pending| PendingView {
                user_id: pending.user_id,
                email: pending.email,
                contact: pending.contact,
                role: pending.role.as_str().to_string(),
                business_name: pending.business_name,
                created_at: pending.created_at,
            })
            .collect();
    }
    Ok(Json(view))
}

async fn decide(
    state: &ServerState,
    principal: &Principal,
    form: &ApprovalForm,
    decision: ApprovalState,
) -> Result<String, ServerError> {
    let user_id = parse_id(&form.user_id, "user id")?;
    state
        .engine
        .set_approval(principal, user_id, decision)
        .await?;
    Ok(match decision {
        ApprovalState::Approved => format!("User #{user_id} approved."),
        _ => format!("User #{user_id} rejected."),
    })
}

pub async fn approve(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<ApprovalForm>,
) -> Redirect {
    let outcome = decide(&state, &principal, &form, ApprovalState::Approved).await;
    redirect_outcome(PENDING_VIEW, outcome)
}

pub async fn reject(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<ApprovalForm>,
) -> Redirect {
    let outcome = decide(&state, &principal, &form, ApprovalState::Rejected).await;
    redirect_outcome(PENDING_VIEW, outcome)
}

pub async fn delete_listing(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<ListingDeleteForm>,
) -> Redirect {
    let outcome = async {
        let listing = ListingRef {
            kind: ListingKind::try_from(form.item_type.as_str())?,
            id: parse_id(&form.item_id, "item id")?,
        };
        state.engine.admin_delete_listing(&principal, listing).await?;
        Ok::<_, ServerError>(format!(
            "Deleted {} #{}.",
            listing.kind.as_str(),
            listing.id
        ))
    }
    .await;
    redirect_outcome(LISTINGS_VIEW, outcome)
}
