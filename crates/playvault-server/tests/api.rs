//! End-to-end API tests against an in-memory database.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use playvault_core::cache::TtlCache;
use playvault_server::auth::JwtManager;
use playvault_server::mailer::Mailer;
use playvault_server::rate_limit::RateLimitConfig;
use playvault_server::realtime::DeviceRegistry;
use playvault_server::routes::{AppState, build_router};
use playvault_server::storage::Database;

struct TestApp {
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_rate_limit(1000).await
    }

    async fn with_rate_limit(max_requests: u64) -> Self {
        let state = AppState {
            db: Database::open_in_memory().await.unwrap(),
            cache: TtlCache::new(),
            jwt: JwtManager::new(b"test-secret", 3600),
            registry: DeviceRegistry::new(),
            mailer: Mailer::disabled(),
            rate_limit: RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            },
        };
        Self { state }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = build_router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Initialize a wallet account and return (token, user json).
    async fn init_gamer(&self, pubkey: &str) -> (String, Value) {
        let (status, body) = self
            .post("/api/v1/game/initialize", None, json!({ "pubkey": pubkey }))
            .await;
        assert_eq!(status, StatusCode::OK, "initialize failed: {body}");
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (token, body["data"]["user"].clone())
    }
}

// === Gamer flows ===

#[tokio::test]
async fn initialize_is_idempotent_per_pubkey() {
    let app = TestApp::new().await;
    let (_, user1) = app.init_gamer("pk1").await;
    let (_, user2) = app.init_gamer("pk1").await;
    assert_eq!(user1["id"], user2["id"]);
    assert_eq!(user1["coins"], 100);
    assert!(user1.get("passwordHash").is_none());
}

#[tokio::test]
async fn signup_and_login_roundtrip() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/v1/game/auth/signup",
            None,
            json!({ "email": "a@b.com", "password": "longenough", "username": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, _) = app
        .post(
            "/api/v1/game/auth/login",
            None,
            json!({ "email": "a@b.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/v1/game/auth/login",
            None,
            json!({ "email": "a@b.com", "password": "longenough" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn google_auth_skips_password_check() {
    let app = TestApp::new().await;
    app.post(
        "/api/v1/game/auth/signup",
        None,
        json!({ "email": "g@b.com", "password": "longenough" }),
    )
    .await;

    let (status, _) = app
        .post(
            "/api/v1/game/auth/login",
            None,
            json!({ "email": "g@b.com", "googleAuth": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn google_auth_signup_needs_no_password() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/game/auth/signup",
            None,
            json!({ "email": "sso@b.com", "googleAuth": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["user"]["authProvider"], "google");

    let (status, _) = app
        .post(
            "/api/v1/game/auth/login",
            None,
            json!({ "email": "sso@b.com", "googleAuth": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // A password login against a passwordless account never succeeds.
    let (status, _) = app
        .post(
            "/api/v1/game/auth/login",
            None,
            json!({ "email": "sso@b.com", "password": "whatever1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Exactly one of password / googleAuth must be given.
    let (status, _) = app
        .post(
            "/api/v1/game/auth/signup",
            None,
            json!({ "email": "x@b.com", "password": "longenough", "googleAuth": true }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/v1/game/auth/signup", None, json!({ "email": "x@b.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/game/getGamer", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());

    let (status, _) = app.get("/api/v1/game/getGamer", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blocked_account_is_rejected() {
    let app = TestApp::new().await;
    let (token, user) = app.init_gamer("pk1").await;

    sqlx::query("UPDATE gamers SET is_blocked = 1 WHERE id = ?")
        .bind(user["id"].as_str().unwrap())
        .execute(app.state.db.pool())
        .await
        .unwrap();

    let (status, _) = app.get("/api/v1/game/getGamer", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_gamer_rejects_unlisted_fields() {
    let app = TestApp::new().await;
    let (token, _) = app.init_gamer("pk1").await;

    let (status, _) = app
        .patch(
            "/api/v1/game/updateGamer",
            Some(&token),
            json!({ "coins": 999_999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch(
            "/api/v1/game/updateGamer",
            Some(&token),
            json!({ "username": "neo" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "neo");
}

#[tokio::test]
async fn solo_play_reward_cycle() {
    let app = TestApp::new().await;
    let (token, _) = app.init_gamer("pk1").await;

    let (status, body) = app
        .post(
            "/api/v1/game/startGame",
            Some(&token),
            json!({ "currentGame": { "mode": "solo" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["isPlaying"], true);

    // Starting twice is rejected.
    let (status, _) = app
        .post(
            "/api/v1/game/startGame",
            Some(&token),
            json!({ "currentGame": { "mode": "solo" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/v1/game/claimRewards",
            Some(&token),
            json!({ "rewardCoins": 25 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["coins"], 125);
    assert_eq!(body["data"]["user"]["isPlaying"], false);

    // Claiming again credits nothing.
    let (status, body) = app
        .post(
            "/api/v1/game/claimRewards",
            Some(&token),
            json!({ "rewardCoins": 25 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["coins"], 125);
}

// === Deal flows ===

async fn create_deal(app: &TestApp, token: &str, seller_sid: &str, title: &str) -> Value {
    let (status, body) = app
        .post(
            "/api/v1/deals/create",
            Some(token),
            json!({
                "secureId": seller_sid,
                "title": title,
                "description": "A full logo design with revisions",
                "duration": "5 days",
                "price": 100.0,
                "currency": "USDC",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["deal"].clone()
}

#[tokio::test]
async fn full_deal_lifecycle() {
    let app = TestApp::new().await;
    let (buyer_token, _) = app.init_gamer("buyer").await;
    let (seller_token, seller) = app.init_gamer("seller").await;
    let seller_sid = seller["secureId"].as_str().unwrap();

    let deal = create_deal(&app, &buyer_token, seller_sid, "Logo design package").await;
    assert_eq!(deal["requestStatus"], "awaiting approval");

    // Only the addressed seller can answer.
    let (status, _) = app
        .patch(
            "/api/v1/deals/acceptRequest",
            Some(&buyer_token),
            json!({ "dealId": deal["id"], "response": "accepted" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .patch(
            "/api/v1/deals/acceptRequest",
            Some(&seller_token),
            json!({ "dealId": deal["id"], "response": "accepted" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deal"]["requestStatus"], "accepted");
    assert_eq!(body["data"]["deal"]["progressStatus"], "awaiting payment");

    // Pay: records the transaction and moves the deal to in progress.
    let (status, body) = app
        .post(
            "/api/v1/transactions/create",
            Some(&buyer_token),
            json!({
                "dealId": deal["id"],
                "txHash": "0xabc",
                "amount": 100.0,
                "currency": "USDC",
                "senderAddress": "buyer",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["deal"]["progressStatus"], "in progress");

    // In progress: no cancel, no delete.
    let (status, _) = app
        .patch(
            "/api/v1/deals/cancelDeal",
            Some(&buyer_token),
            json!({ "dealId": deal["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .delete(
            &format!("/api/v1/deals/delete/{}", deal["id"].as_str().unwrap()),
            Some(&buyer_token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_tx_hash_is_conflict() {
    let app = TestApp::new().await;
    let (buyer_token, _) = app.init_gamer("buyer").await;
    let (_, seller) = app.init_gamer("seller").await;
    let seller_sid = seller["secureId"].as_str().unwrap();

    let deal = create_deal(&app, &buyer_token, seller_sid, "Logo design package").await;
    let pay = json!({
        "dealId": deal["id"],
        "txHash": "0xabc",
        "amount": 100.0,
        "currency": "USDC",
        "senderAddress": "buyer",
    });
    let (status, _) = app
        .post("/api/v1/transactions/create", Some(&buyer_token), pay.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/v1/transactions/create", Some(&buyer_token), pay)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn deal_listings_are_cached() {
    let app = TestApp::new().await;
    let (buyer_token, _) = app.init_gamer("buyer").await;
    let (seller_token, seller) = app.init_gamer("seller").await;
    let seller_sid = seller["secureId"].as_str().unwrap();

    create_deal(&app, &buyer_token, seller_sid, "Logo design package").await;

    let (status, first) = app.get("/api/v1/deals/user_requests", Some(&seller_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["deals"].as_array().unwrap().len(), 1);
    assert_eq!(first["data"]["pagination"]["total"], 1);

    // Mutate behind the cache; the cached page is served until invalidated.
    sqlx::query("DELETE FROM deals")
        .execute(app.state.db.pool())
        .await
        .unwrap();
    let (_, cached) = app.get("/api/v1/deals/user_requests", Some(&seller_token)).await;
    assert_eq!(cached["data"]["deals"].as_array().unwrap().len(), 1);

    // A new deal drops the seller's cached pages.
    create_deal(&app, &buyer_token, seller_sid, "Second deal with long title").await;
    let (_, fresh) = app.get("/api/v1/deals/user_requests", Some(&seller_token)).await;
    assert_eq!(fresh["data"]["deals"].as_array().unwrap().len(), 1);
    assert_eq!(fresh["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn deal_detail_hidden_from_outsiders() {
    let app = TestApp::new().await;
    let (buyer_token, _) = app.init_gamer("buyer").await;
    let (_, seller) = app.init_gamer("seller").await;
    let (outsider_token, _) = app.init_gamer("outsider").await;
    let seller_sid = seller["secureId"].as_str().unwrap();

    let deal = create_deal(&app, &buyer_token, seller_sid, "Logo design package").await;
    let uri = format!("/api/v1/deals/deal/{}", deal["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, Some(&outsider_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// === Multiplayer flows ===

async fn create_game(app: &TestApp, token: &str) -> Value {
    let (status, body) = app
        .post(
            "/api/v1/multiplayer/create",
            Some(token),
            json!({
                "gameType": "word rush",
                "title": "Friday night",
                "duration": "90",
                "reward": 50.0,
                "currency": "GOR",
                "stake": 5.0,
                "playerName": "hostplayer",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["game"].clone()
}

#[tokio::test]
async fn game_responses_never_leak_letters_or_wallet_secret() {
    let app = TestApp::new().await;
    let (host_token, _) = app.init_gamer("host").await;

    let game = create_game(&app, &host_token).await;
    assert!(game.get("letters").is_none());
    assert!(game.get("walletSecret").is_none());
    assert!(game["walletPubkey"].as_str().is_some());
    assert_eq!(game["gameStatus"], "pending");

    let code = game["gameCode"].as_str().unwrap();
    let (status, body) = app
        .get(&format!("/api/v1/multiplayer/getGame/{code}"), Some(&host_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["game"].get("letters").is_none());
    assert!(body["data"]["game"].get("walletSecret").is_none());
}

#[tokio::test]
async fn second_pending_game_is_conflict() {
    let app = TestApp::new().await;
    let (host_token, _) = app.init_gamer("host").await;
    create_game(&app, &host_token).await;

    let (status, _) = app
        .post(
            "/api/v1/multiplayer/create",
            Some(&host_token),
            json!({
                "gameType": "word rush",
                "duration": "90",
                "currency": "GOR",
                "playerName": "hostplayer",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn multiplayer_round_with_letters_released_once() {
    let app = TestApp::new().await;
    let (host_token, _) = app.init_gamer("host").await;
    let (player_token, _) = app.init_gamer("player2").await;

    let game = create_game(&app, &host_token).await;
    let code = game["gameCode"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/multiplayer/addPlayer",
            Some(&player_token),
            json!({ "gameCode": code, "playerName": "bob" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["game"]["players"].as_array().unwrap().len(), 2);

    // Not started yet: informational 200, no letters.
    let (status, body) = app
        .post(
            "/api/v1/multiplayer/playGame",
            Some(&player_token),
            json!({ "gameCode": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("letters").is_none());

    let (status, _) = app
        .patch(
            "/api/v1/multiplayer/updateGame",
            Some(&host_token),
            json!({ "gameCode": code, "update": { "gameStatus": "ongoing" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/multiplayer/playGame",
            Some(&player_token),
            json!({ "gameCode": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["letters"].as_array().unwrap().len(), 16);

    // Fetching letters alone does not consume the turn; a client that
    // crashed before recording its play can fetch them again.
    let (status, body) = app
        .post(
            "/api/v1/multiplayer/playGame",
            Some(&player_token),
            json!({ "gameCode": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["letters"].as_array().unwrap().len(), 16);

    // Recording the play is what closes the turn.
    let (status, _) = app
        .patch(
            "/api/v1/multiplayer/updateplayer",
            Some(&player_token),
            json!({ "gameCode": code, "update": { "isPlayed": true, "playerScore": 42 } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/multiplayer/playGame",
            Some(&player_token),
            json!({ "gameCode": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("letters").is_none());
}

#[tokio::test]
async fn only_host_can_update_or_delete_game() {
    let app = TestApp::new().await;
    let (host_token, _) = app.init_gamer("host").await;
    let (other_token, _) = app.init_gamer("other").await;

    let game = create_game(&app, &host_token).await;
    let code = game["gameCode"].as_str().unwrap();

    let (status, _) = app
        .patch(
            "/api/v1/multiplayer/updateGame",
            Some(&other_token),
            json!({ "gameCode": code, "update": { "title": "hijacked" } }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/v1/multiplayer/delete/{code}"), Some(&other_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/v1/multiplayer/delete/{code}"), Some(&host_token))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn host_payment_marks_game() {
    let app = TestApp::new().await;
    let (host_token, _) = app.init_gamer("host").await;
    let game = create_game(&app, &host_token).await;
    let code = game["gameCode"].as_str().unwrap();

    let (status, body) = app
        .patch(
            "/api/v1/multiplayer/updateplayer",
            Some(&host_token),
            json!({ "gameCode": code, "update": { "isPayed": true } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["game"]["hostPayed"], true);
}

#[tokio::test]
async fn game_listing_endpoints() {
    let app = TestApp::new().await;
    let (host_token, _) = app.init_gamer("host").await;
    let (player_token, _) = app.init_gamer("player2").await;
    let game = create_game(&app, &host_token).await;
    let code = game["gameCode"].as_str().unwrap();

    app.post(
        "/api/v1/multiplayer/addPlayer",
        Some(&player_token),
        json!({ "gameCode": code, "playerName": "bob" }),
    )
    .await;

    let (status, body) = app
        .get("/api/v1/multiplayer/hostPendingGames", Some(&host_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["game"]["gameCode"], *code);

    let (_, body) = app.get("/api/v1/multiplayer/hostGames", Some(&host_token)).await;
    assert_eq!(body["data"]["games"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let (_, body) = app
        .get("/api/v1/multiplayer/playerGames", Some(&player_token))
        .await;
    assert_eq!(body["data"]["games"].as_array().unwrap().len(), 1);
}

// === Admin flows ===

#[tokio::test]
async fn admin_session_and_password_reset() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/admin/addAdmin",
            None,
            json!({ "email": "ops@example.com", "password": "longenough", "role": "manager" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    // The disabled test mailer drops mail without failing.
    assert_eq!(body["data"]["emailSent"], true);

    let (status, body) = app
        .post(
            "/api/v1/admin/login",
            None,
            json!({ "email": "ops@example.com", "password": "longenough" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["admin"]["role"], "manager");
    assert!(body["data"]["admin"].get("passwordHash").is_none());

    let (status, body) = app.get("/api/v1/admin/getAdmin", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["admin"]["email"], "ops@example.com");

    // Reset flow: the response never reveals whether the email exists.
    let (status, _) = app
        .post("/api/v1/admin/forgotPassword", None, json!({ "email": "nobody@x.y" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/admin/forgotPassword",
            None,
            json!({ "email": "ops@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The code is only held in the cache; read it out for the test.
    let code = app.state.cache.get("otp:ops@example.com").await.unwrap();
    let (status, _) = app
        .patch(
            "/api/v1/admin/updatePassword",
            None,
            json!({ "email": "ops@example.com", "code": code, "newPassword": "evenlonger1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The code was one-shot.
    let (status, _) = app
        .patch(
            "/api/v1/admin/updatePassword",
            None,
            json!({ "email": "ops@example.com", "code": code, "newPassword": "evenlonger2" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/admin/login",
            None,
            json!({ "email": "ops@example.com", "password": "evenlonger1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/v1/admin/logout", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

// === Infrastructure ===

#[tokio::test]
async fn rate_limit_returns_429() {
    let app = TestApp::with_rate_limit(3).await;

    for _ in 0..3 {
        let (status, _) = app.get("/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.get("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Too many requests"));
}

#[tokio::test]
async fn rate_limit_keys_on_forwarded_ip() {
    let app = TestApp::with_rate_limit(1).await;

    let request = |ip: &str| {
        Request::builder()
            .method(Method::GET)
            .uri("/api/v1/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = build_router(app.state.clone()).oneshot(request("1.1.1.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = build_router(app.state.clone()).oneshot(request("1.1.1.1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let other = build_router(app.state.clone()).oneshot(request("2.2.2.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn error_body_shape_is_stable() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post("/api/v1/game/initialize", None, json!({ "pubkey": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn malformed_body_keeps_error_shape() {
    let app = TestApp::new().await;

    // Unparseable JSON never falls through to the framework default.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/game/initialize")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = build_router(app.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().is_some());

    // A body missing required fields gets the same treatment.
    let (status, body) = app.post("/api/v1/game/auth/signup", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}
