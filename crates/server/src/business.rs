//! Garage and vendor routes: profiles, dashboards, listings and orders.

use api_types::{
    Flash,
    business::{
        DashboardView, ListingDeleteForm, ListingView, ListingsView, OrderView, OrdersQuery,
        OrdersView, ProfileView,
    },
};
use axum::{
    Extension, Form, Json,
    extract::{Multipart, Path, Query, State},
    response::Redirect,
};
use engine::{
    BusinessKind, BusinessOrder, BusinessProfile, BusinessRef, Listing, ListingInput, Principal,
    TransactionStatus,
};

use crate::{
    ServerError, amount,
    forms::{MultipartForm, non_blank, parse_amount, parse_id},
    redirect_outcome,
    server::ServerState,
    upload::UploadedFile,
};

const PROFILE_VIEW: &str = "/business/profile";
const LISTINGS_VIEW: &str = "/business/listings";

fn profile_subdir(kind: BusinessKind) -> &'static str {
    match kind {
        BusinessKind::Garage => "garage_profiles",
        BusinessKind::Vendor => "vendor_profiles",
    }
}

fn listing_subdir(kind: BusinessKind) -> &'static str {
    match kind {
        BusinessKind::Garage => "service_images",
        BusinessKind::Vendor => "part_images",
    }
}

fn listing_view(listing: Listing) -> ListingView {
    ListingView {
        id: listing.reference.id,
        item_type: listing.reference.kind.as_str().to_string(),
        name: listing.name,
        price: amount(listing.price),
        description: listing.description,
        image_path: listing.image_path,
    }
}

fn order_view(order: BusinessOrder) -> OrderView {
    OrderView {
        transaction_id: order.entry.id,
        customer_email: order.customer_email,
        item_name: order.item_name,
        amount: amount(order.entry.amount),
        status: order.entry.status.as_str().to_string(),
        created_at: order.entry.created_at,
    }
}

fn profile_view(profile: BusinessProfile, flash: Flash) -> ProfileView {
    let business = profile.business;
    ProfileView {
        business_type: business.reference.kind.as_str().to_string(),
        business_id: business.reference.id,
        name: business.name,
        owner_user_id: business.owner_user_id,
        owner_email: profile.owner_email,
        contact: profile.contact,
        city: profile.city,
        district: profile.district,
        description: business.description,
        image_path: business.image_path,
        average_rating: profile.average_rating,
        listings: profile.listings.into_iter().map(listing_view).collect(),
        flash,
    }
}

/// Public profile of any garage or vendor
pub async fn public_profile(
    State(state): State<ServerState>,
    Path((kind, id)): Path<(String, String)>,
    Query(flash): Query<Flash>,
) -> Result<Json<ProfileView>, ServerError> {
    let reference = BusinessRef {
        kind: BusinessKind::try_from(kind.as_str())?,
        id: parse_id(&id, "business id")?,
    };
    let profile = state.engine.business_profile(reference).await?;
    Ok(Json(profile_view(profile, flash)))
}

pub async fn own_profile(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(flash): Query<Flash>,
) -> Result<Json<ProfileView>, ServerError> {
    let reference = principal.require_business(None)?;
    let profile = state.engine.business_profile(reference).await?;
    Ok(Json(profile_view(profile, flash)))
}

/// Handle multipart profile updates: `description` plus optional
/// `profile_image`
pub async fn update_profile(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Redirect {
    redirect_outcome(PROFILE_VIEW, save_profile(&state, &principal, multipart).await)
}

async fn save_profile(
    state: &ServerState,
    principal: &Principal,
    multipart: Multipart,
) -> Result<String, ServerError> {
    let reference = principal.require_business(None)?;
    let form = MultipartForm::read(multipart, "profile_image").await?;

    let (stored, previous) = match &form.file {
        Some(file) => {
            let previous = state
                .engine
                .business_by_owner(principal.user_id)
                .await?
                .and_then(|business| business.image_path);
            let stored = state
                .uploads
                .store(profile_subdir(reference.kind), reference.id, file)
                .await?;
            (Some(stored), previous)
        }
        None => (None, None),
    };

    let updated = state
        .engine
        .update_business_profile(principal, form.optional("description"), stored.clone())
        .await;
    if let Err(err) = updated {
        discard(state, stored.as_deref(), previous.as_deref()).await;
        return Err(err.into());
    }
    replace(state, previous, stored.as_deref()).await;
    Ok("Profile updated.".to_string())
}

/// Removes an upload the engine never recorded, unless it landed on the
/// name of the image still in use.
async fn discard(state: &ServerState, stored: Option<&str>, kept: Option<&str>) {
    if let Some(stored) = stored.filter(|s| kept != Some(*s)) {
        state.uploads.remove(stored).await;
    }
}

/// Removes the image a successful update replaced. Two uploads in the same
/// second share a file name, so the file is only removed when it differs
/// from the one now in use.
async fn replace(state: &ServerState, previous: Option<String>, current: Option<&str>) {
    if let Some(previous) = previous.filter(|p| current.is_some_and(|c| c != p)) {
        state.uploads.remove(&previous).await;
    }
}

/// Garage and vendor dashboards share one handler
pub async fn dashboard(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(flash): Query<Flash>,
) -> Result<Json<DashboardView>, ServerError> {
    let dashboard = state.engine.business_dashboard(&principal).await?;
    Ok(Json(DashboardView {
        business_type: dashboard.business.reference.kind.as_str().to_string(),
        name: dashboard.business.name,
        listing_count: dashboard.listing_count,
        orders_last_7_days: dashboard.orders_last_7_days,
        pending_orders: dashboard.pending_orders,
        average_rating: dashboard.average_rating,
        recent_orders: dashboard.recent_orders.into_iter().map(order_view).collect(),
        flash,
    }))
}

pub async fn listings(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(flash): Query<Flash>,
) -> Result<Json<ListingsView>, ServerError> {
    let reference = principal.require_business(None)?;
    let listings = state.engine.listings_for(reference).await?;
    Ok(Json(ListingsView {
        listings: listings.into_iter().map(listing_view).collect(),
        flash,
    }))
}

fn listing_input(form: &MultipartForm) -> Result<ListingInput, ServerError> {
    Ok(ListingInput {
        name: form.text("name").to_string(),
        price: parse_amount(form.text("price"))?,
        description: form.optional("description").map(ToString::to_string),
        image_path: None,
    })
}

pub async fn add_listing(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Redirect {
    redirect_outcome(LISTINGS_VIEW, create_listing(&state, &principal, multipart).await)
}

/// The image is stored once the row exists, so the file name carries the
/// listing id. The listing is dropped again if the image cannot be kept.
async fn create_listing(
    state: &ServerState,
    principal: &Principal,
    multipart: Multipart,
) -> Result<String, ServerError> {
    let reference = principal.require_business(None)?;
    let form = MultipartForm::read(multipart, "image").await?;
    if let Some(file) = &form.file {
        state.uploads.check(file)?;
    }
    let listing = state
        .engine
        .add_listing(principal, listing_input(&form)?)
        .await?;

    if let Some(file) = &form.file {
        if let Err(err) =
            attach_image(state, principal, reference.kind, listing.reference.id, file).await
        {
            if let Err(undo) = state
                .engine
                .delete_listing(principal, listing.reference.id)
                .await
            {
                tracing::error!(
                    listing_id = listing.reference.id,
                    "failed to drop listing after upload error: {undo}"
                );
            }
            return Err(err);
        }
    }
    Ok(format!("Added {}.", listing.name))
}

async fn attach_image(
    state: &ServerState,
    principal: &Principal,
    kind: BusinessKind,
    listing_id: i32,
    file: &UploadedFile,
) -> Result<(), ServerError> {
    let stored = state
        .uploads
        .store(listing_subdir(kind), listing_id, file)
        .await?;
    if let Err(err) = state
        .engine
        .set_listing_image(principal, listing_id, &stored)
        .await
    {
        state.uploads.remove(&stored).await;
        return Err(err.into());
    }
    Ok(())
}

pub async fn edit_listing(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Redirect {
    redirect_outcome(LISTINGS_VIEW, update_listing(&state, &principal, multipart).await)
}

async fn update_listing(
    state: &ServerState,
    principal: &Principal,
    multipart: Multipart,
) -> Result<String, ServerError> {
    let reference = principal.require_business(None)?;
    let form = MultipartForm::read(multipart, "image").await?;
    let listing_id = parse_id(form.text("listing_id"), "listing id")?;
    let mut input = listing_input(&form)?;

    let previous = match &form.file {
        Some(file) => {
            let current = state.engine.listing(principal, listing_id).await?;
            input.image_path = Some(
                state
                    .uploads
                    .store(listing_subdir(reference.kind), listing_id, file)
                    .await?,
            );
            current.image_path
        }
        None => None,
    };

    let stored = input.image_path.clone();
    let listing = match state.engine.edit_listing(principal, listing_id, input).await {
        Ok(listing) => listing,
        Err(err) => {
            discard(state, stored.as_deref(), previous.as_deref()).await;
            return Err(err.into());
        }
    };
    replace(state, previous, stored.as_deref()).await;
    Ok(format!("Updated {}.", listing.name))
}

pub async fn delete_listing(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Form(form): Form<ListingDeleteForm>,
) -> Redirect {
    let outcome = async {
        let listing_id = parse_id(&form.listing_id, "listing id")?;
        let listing = state.engine.delete_listing(&principal, listing_id).await?;
        if let Some(image) = &listing.image_path {
            state.uploads.remove(image).await;
        }
        Ok::<_, ServerError>(format!("Deleted {}.", listing.name))
    }
    .await;
    redirect_outcome(LISTINGS_VIEW, outcome)
}

/// Orders received, `?status=all|pending|completed|cancelled`
pub async fn orders(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<OrdersQuery>,
    Query(flash): Query<Flash>,
) -> Result<Json<OrdersView>, ServerError> {
    let status = match non_blank(query.status.as_deref()) {
        None => None,
        Some(raw) if raw.eq_ignore_ascii_case("all") => None,
        Some(raw) => Some(TransactionStatus::try_from(raw)?),
    };
    let orders = state
        .engine
        .business_transactions(&principal, status)
        .await?;
    Ok(Json(OrdersView {
        status: status.map_or("all", TransactionStatus::as_str).to_string(),
        orders: orders.into_iter().map(order_view).collect(),
        flash,
    }))
}
