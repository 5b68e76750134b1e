//! HTTP API surface.
//!
//! All routes live under `/api/v1`. Success responses use the
//! `{message, data}` envelope; errors render `{"error": <message>}` through
//! [`crate::error::ApiError`].

mod admins;
mod deals;
mod games;
mod gamers;
mod transactions;

use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use playvault_core::cache::TtlCache;

use crate::auth::JwtManager;
use crate::mailer::Mailer;
use crate::rate_limit::{self, RateLimitConfig};
use crate::realtime::{ws, DeviceRegistry};
use crate::storage::Database;

/// Cached deal listings live this long.
pub(crate) const DEAL_CACHE_TTL: Duration = Duration::from_secs(600);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: TtlCache,
    pub jwt: JwtManager,
    pub registry: DeviceRegistry,
    pub mailer: Mailer,
    pub rate_limit: RateLimitConfig,
}

/// Standard success envelope.
pub(crate) fn success<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "message": message, "data": data })),
    )
        .into_response()
}

/// Success envelope with 201 Created.
pub(crate) fn created<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "message": message, "data": data })),
    )
        .into_response()
}

async fn health() -> Response {
    success("ok", json!({}))
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let game = Router::new()
        .route("/initialize", post(gamers::initialize))
        .route("/auth/signup", post(gamers::signup))
        .route("/auth/login", post(gamers::login))
        .route("/getGamer", get(gamers::get_gamer))
        .route("/updateGamer", patch(gamers::update_gamer))
        .route("/startGame", post(gamers::start_game))
        .route("/claimRewards", post(gamers::claim_rewards));

    let deals = Router::new()
        .route("/create", post(deals::create))
        .route("/acceptRequest", patch(deals::accept_request))
        .route("/cancelDeal", patch(deals::cancel))
        .route("/delete/{deal_id}", delete(deals::remove))
        .route("/deal/{deal_id}", get(deals::detail))
        .route("/user_requests", get(deals::user_requests))
        .route("/user_deals", get(deals::user_deals));

    let transactions = Router::new().route("/create", post(transactions::create));

    let multiplayer = Router::new()
        .route("/create", post(games::create))
        .route("/getGame/{game_code}", get(games::detail))
        .route("/addPlayer", post(games::add_player))
        .route("/updateplayer", patch(games::update_player))
        .route("/updateGame", patch(games::update_game))
        .route("/playGame", post(games::play))
        .route("/removePlayer", post(games::remove_player))
        .route("/hostPendingGames", get(games::host_pending))
        .route("/hostGames", get(games::host_games))
        .route("/playerGames", get(games::player_games))
        .route("/delete/{game_code}", delete(games::remove));

    let admin = Router::new()
        .route("/login", post(admins::login))
        .route("/addAdmin", post(admins::add_admin))
        .route("/forgotPassword", post(admins::forgot_password))
        .route("/updatePassword", patch(admins::update_password))
        .route("/getAdmin", get(admins::get_admin))
        .route("/logout", post(admins::logout));

    let api = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .nest("/game", game)
        .nest("/deals", deals)
        .nest("/transactions", transactions)
        .nest("/multiplayer", multiplayer)
        .nest("/admin", admin);

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
