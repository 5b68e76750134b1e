//! Multiplayer game session handlers.
//!
//! Mutations fan out a `sync_game_state` event to the game's room so every
//! connected player sees lobby changes without polling.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extract::AuthGamer;
use crate::error::{ApiError, ApiResult, Body};
use crate::realtime::Event;
use crate::storage::status::GameCurrency;
use crate::storage::{
    Game, GameUpdate, GameView, Gamer, NewGame, NewPlayer, Pagination, PlayOutcome, Player,
    PlayerUpdate, clamp_pagination,
};

use super::deals::PageQuery;
use super::{AppState, created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub game_type: String,
    pub title: Option<String>,
    pub duration: String,
    pub reward: Option<f64>,
    pub currency: GameCurrency,
    pub stake: Option<f64>,
    pub player_name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlayerRequest {
    pub game_code: String,
    pub player_name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayerRequest {
    pub game_code: String,
    pub update: PlayerUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGameRequest {
    pub game_code: String,
    pub update: GameUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayGameRequest {
    pub game_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePlayerRequest {
    pub game_code: String,
    pub pubkey: String,
}

fn require_pubkey(gamer: &Gamer) -> ApiResult<&str> {
    gamer
        .pubkey
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Your account has no wallet pubkey".into()))
}

async fn broadcast_state(state: &AppState, game: Game, players: Vec<Player>) -> GameView {
    let view = GameView::from_parts(game, players);
    state
        .registry
        .emit_to_room(
            &view.game_code,
            &Event::new("sync_game_state", json!({ "game": view })),
            None,
        )
        .await;
    view
}

/// `POST /api/v1/multiplayer/create`
pub async fn create(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<CreateGameRequest>,
) -> ApiResult<Response> {
    let host = require_pubkey(&gamer)?.to_string();
    let (game, players) = state
        .db
        .create_game(NewGame {
            host,
            game_type: req.game_type,
            title: req.title,
            duration: req.duration,
            reward: req.reward,
            currency: req.currency,
            stake: req.stake,
            host_name: req.player_name,
            profile_picture: req.profile_picture,
        })
        .await?;

    let view = GameView::from_parts(game, players);
    Ok(created("Game created successfully", json!({ "game": view })))
}

/// `GET /api/v1/multiplayer/getGame/{game_code}`
pub async fn detail(
    State(state): State<AppState>,
    AuthGamer(_gamer): AuthGamer,
    Path(game_code): Path<String>,
) -> ApiResult<Response> {
    let game = state.db.get_game_by_code(&game_code).await?;
    let players = state.db.game_players(&game.id).await?;
    let view = GameView::from_parts(game, players);
    Ok(success("Game fetched successfully", json!({ "game": view })))
}

/// `POST /api/v1/multiplayer/addPlayer`
pub async fn add_player(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<AddPlayerRequest>,
) -> ApiResult<Response> {
    let pubkey = require_pubkey(&gamer)?.to_string();
    let (game, players) = state
        .db
        .add_player(
            &req.game_code,
            NewPlayer {
                pubkey,
                player_name: req.player_name,
                profile_picture: req.profile_picture,
            },
        )
        .await?;

    let view = broadcast_state(&state, game, players).await;
    Ok(success("Player added successfully", json!({ "game": view })))
}

/// `PATCH /api/v1/multiplayer/updateplayer` — a player updates their own
/// flags and score.
pub async fn update_player(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<UpdatePlayerRequest>,
) -> ApiResult<Response> {
    let pubkey = require_pubkey(&gamer)?.to_string();
    let (game, players) = state
        .db
        .update_player(&req.game_code, &pubkey, req.update)
        .await?;

    let view = broadcast_state(&state, game, players).await;
    Ok(success("Player updated successfully", json!({ "game": view })))
}

/// `PATCH /api/v1/multiplayer/updateGame` — host-only.
pub async fn update_game(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<UpdateGameRequest>,
) -> ApiResult<Response> {
    let host = require_pubkey(&gamer)?.to_string();
    let (game, players) = state
        .db
        .update_game(&req.game_code, &host, req.update)
        .await?;

    let view = broadcast_state(&state, game, players).await;
    Ok(success("Game updated successfully", json!({ "game": view })))
}

/// `POST /api/v1/multiplayer/playGame` — release the hidden letters to the
/// caller, once. The "not yet"/"already" outcomes are informational 200s,
/// not errors.
pub async fn play(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<PlayGameRequest>,
) -> ApiResult<Response> {
    let pubkey = require_pubkey(&gamer)?.to_string();
    let outcome = state.db.play_game(&req.game_code, &pubkey).await?;

    Ok(match outcome {
        PlayOutcome::NotStarted => success("Game has not started yet", json!({})),
        PlayOutcome::Ended => success("Game has already ended", json!({})),
        PlayOutcome::AlreadyPlayed => success("You have already played this game", json!({})),
        PlayOutcome::Play { letters, duration } => success(
            "Good luck!",
            json!({ "letters": letters, "duration": duration }),
        ),
    })
}

/// `POST /api/v1/multiplayer/removePlayer` — leave a lobby, or as host,
/// remove another player.
pub async fn remove_player(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<RemovePlayerRequest>,
) -> ApiResult<Response> {
    let caller = require_pubkey(&gamer)?.to_string();
    if caller != req.pubkey {
        let game = state.db.get_game_by_code(&req.game_code).await?;
        if game.host != caller {
            return Err(ApiError::Forbidden(
                "Only the host can remove other players".into(),
            ));
        }
    }

    let (game, players) = state.db.remove_player(&req.game_code, &req.pubkey).await?;
    let view = broadcast_state(&state, game, players).await;
    Ok(success("Player removed successfully", json!({ "game": view })))
}

/// `GET /api/v1/multiplayer/hostPendingGames`
pub async fn host_pending(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
) -> ApiResult<Response> {
    let host = require_pubkey(&gamer)?;
    let view = state
        .db
        .host_pending_game(host)
        .await?
        .map(|(game, players)| GameView::from_parts(game, players));
    Ok(success("Pending game fetched successfully", json!({ "game": view })))
}

/// `GET /api/v1/multiplayer/hostGames`
pub async fn host_games(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let host = require_pubkey(&gamer)?;
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let (games, total) = state.db.list_host_games(host, page, limit).await?;
    let views: Vec<GameView> =
        games.into_iter().map(|(game, players)| GameView::from_parts(game, players)).collect();
    Ok(success(
        "Games fetched successfully",
        json!({ "games": views, "pagination": Pagination::new(page, limit, total) }),
    ))
}

/// `GET /api/v1/multiplayer/playerGames`
pub async fn player_games(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let pubkey = require_pubkey(&gamer)?;
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let (games, total) = state.db.list_player_games(pubkey, page, limit).await?;
    let views: Vec<GameView> =
        games.into_iter().map(|(game, players)| GameView::from_parts(game, players)).collect();
    Ok(success(
        "Games fetched successfully",
        json!({ "games": views, "pagination": Pagination::new(page, limit, total) }),
    ))
}

/// `DELETE /api/v1/multiplayer/delete/{game_code}` — host-only.
pub async fn remove(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Path(game_code): Path<String>,
) -> ApiResult<Response> {
    let host = require_pubkey(&gamer)?.to_string();
    let game = state.db.delete_game(&game_code, &host).await?;

    state
        .registry
        .emit_to_room(
            &game.game_code,
            &Event::new("sync_game_state", json!({ "deleted": true, "gameCode": game.game_code })),
            None,
        )
        .await;

    Ok(success("Game deleted successfully", json!({ "gameCode": game.game_code })))
}
