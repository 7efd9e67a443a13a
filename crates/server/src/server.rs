use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;

use std::{path::PathBuf, sync::Arc};

use crate::{SESSION_COOKIE, ServerError, UploadSink, admin, auth, business, customer, messages};
use engine::Engine;

/// Slack above the upload limit for the other multipart fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub uploads: UploadSink,
}

/// Where the HTTP surface listens and stores uploads.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Resolves the session cookie into an [`engine::Principal`] request
/// extension. Anything else is sent back to the landing page.
async fn require_session(
    State(state): State<ServerState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return ServerError::Unauthenticated.into_redirect("/").into_response();
    };

    match state.engine.resolve_session(&token).await {
        Ok(Some(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(None) => ServerError::Unauthenticated
            .into_redirect("/")
            .into_response(),
        Err(err) => ServerError::from(err).into_redirect("/").into_response(),
    }
}

fn router(state: ServerState) -> Router {
    let body_limit = state.uploads.max_bytes() + FORM_OVERHEAD_BYTES;

    let protected = Router::new()
        .route("/logout", post(auth::logout))
        .route("/customer/dashboard", get(customer::dashboard))
        .route("/transactions/request", post(customer::request))
        .route("/transactions/recharge", post(customer::recharge))
        .route("/transactions/finalize", post(customer::finalize))
        .route("/transactions/rate", post(customer::rate))
        .route("/businesses/{kind}/{id}", get(business::public_profile))
        .route("/garage/dashboard", get(business::dashboard))
        .route("/vendor/dashboard", get(business::dashboard))
        .route(
            "/business/profile",
            get(business::own_profile).post(business::update_profile),
        )
        .route("/business/listings", get(business::listings))
        .route("/business/listings/add", post(business::add_listing))
        .route("/business/listings/edit", post(business::edit_listing))
        .route("/business/listings/delete", post(business::delete_listing))
        .route("/business/transactions", get(business::orders))
        .route("/messages", get(messages::inbox))
        .route("/messages/send", post(messages::send))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/approve", post(admin::approve))
        .route("/admin/reject", post(admin::reject))
        .route("/admin/listings/delete", post(admin::delete_listing))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(auth::landing))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Builds the full router around `engine`.
pub fn app(engine: Engine, uploads: UploadSink) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
        uploads,
    })
}

pub async fn run(engine: Engine, config: ServerConfig) {
    let address = format!("{}:{}", config.bind, config.port);
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {address}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, config, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let uploads = UploadSink::new(config.upload_dir, config.max_upload_bytes);
    axum::serve(listener, app(engine, uploads)).await
}
