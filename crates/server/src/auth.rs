//! Landing page, sign-up, login and logout.

use api_types::{
    Flash,
    auth::{LandingView, LoginForm, RegisterForm},
};
use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use engine::{NewRegistration, Principal, Role};

use crate::{
    SESSION_COOKIE, ServerError, flash_redirect, forms::non_blank, redirect_outcome,
    server::ServerState,
};

pub async fn landing(Query(flash): Query<Flash>) -> Json<LandingView> {
    Json(LandingView { flash })
}

/// Handle requests for self-service registration
pub async fn register(
    State(state): State<ServerState>,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    redirect_outcome("/", register_account(&state, form).await)
}

async fn register_account(state: &ServerState, form: RegisterForm) -> Result<String, ServerError> {
    let role = Role::try_from(form.role.as_str())?;
    let principal = state
        .engine
        .register(NewRegistration {
            email: form.email,
            password: form.password,
            role,
            contact: form.contact,
            city: form.city,
            district: form.district,
            business_name: non_blank(form.business_name.as_deref()).map(ToString::to_string),
        })
        .await?;
    Ok(if principal.role.is_business() {
        "Registration successful. Your account is awaiting admin approval.".to_string()
    } else {
        "Registration successful. Please log in.".to_string()
    })
}

/// Handle login requests, opening a session on success
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match open_session(&state, &form).await {
        Ok((principal, token)) => {
            let cookie = Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (
                jar.add(cookie),
                flash_redirect(
                    principal.role.dashboard_path(),
                    api_types::FlashStatus::Success,
                    "Welcome back.",
                ),
            )
                .into_response()
        }
        Err(err) => err.into_redirect("/").into_response(),
    }
}

async fn open_session(
    state: &ServerState,
    form: &LoginForm,
) -> Result<(Principal, String), ServerError> {
    let role = Role::try_from(form.role.as_str())?;
    let principal = state
        .engine
        .authenticate(&form.email, &form.password, role)
        .await?;
    let token = state.engine.open_session(&principal).await?;
    Ok((principal, token))
}

pub async fn logout(State(state): State<ServerState>, jar: CookieJar) -> Response {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        if let Err(err) = state.engine.close_session(&token).await {
            tracing::warn!("failed to close session: {err}");
        }
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (
        jar,
        flash_redirect("/", api_types::FlashStatus::Success, "Logged out."),
    )
        .into_response()
}
