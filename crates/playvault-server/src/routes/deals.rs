//! Deal handlers: escrow agreement lifecycle plus cached listings.
//!
//! Listing and detail responses are cached read-through with short TTLs;
//! every mutation drops the affected seller prefix and, deliberately
//! broadly, the whole buyer-listing prefix.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extract::AuthGamer;
use crate::error::{ApiError, ApiResult, Body};
use crate::realtime::Event;
use crate::storage::{Deal, NewDeal, Pagination, clamp_pagination};
use crate::storage::status::{Currency, RequestResponse};

use super::{AppState, DEAL_CACHE_TTL, created, success};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub secure_id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub price: f64,
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub deal_id: String,
    pub response: RequestResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub deal_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn invalidate_deal_caches(state: &AppState, deal: &Deal) {
    state
        .cache
        .invalidate_prefix(&format!("deals:seller:{}", deal.secure_id))
        .await;
    // Buyer listings key on the internal user id which the seller side does
    // not know, so the whole prefix goes.
    state.cache.invalidate_prefix("deals:user:").await;
    state.cache.remove(&format!("deals:detail:{}", deal.id)).await;
}

/// Wake the counterparty's devices so open deal screens refetch.
async fn notify_seller(state: &AppState, deal: &Deal) {
    if let Ok(Some(seller)) = state.db.get_gamer_by_secure_id(&deal.secure_id).await {
        state
            .registry
            .emit_to_user(&seller.id, &Event::new("sync_requested", json!({ "dealId": deal.id })))
            .await;
    }
}

/// `POST /api/v1/deals/create`
pub async fn create(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<CreateDealRequest>,
) -> ApiResult<Response> {
    let deal = state
        .db
        .create_deal(
            NewDeal {
                creator_id: gamer.id.clone(),
                secure_id: req.secure_id,
                title: req.title,
                description: req.description,
                duration: req.duration,
                price: req.price,
                currency: req.currency,
            },
            &gamer.secure_id,
        )
        .await?;

    invalidate_deal_caches(&state, &deal).await;
    notify_seller(&state, &deal).await;

    Ok(created("Deal created successfully", json!({ "deal": deal })))
}

/// `PATCH /api/v1/deals/acceptRequest` — the authenticated seller accepts
/// or declines a request addressed to them.
pub async fn accept_request(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<RespondRequest>,
) -> ApiResult<Response> {
    let deal = state
        .db
        .respond_to_deal(&gamer.secure_id, &req.deal_id, req.response)
        .await?;

    invalidate_deal_caches(&state, &deal).await;
    state
        .registry
        .emit_to_user(
            &deal.creator_id,
            &Event::new("sync_requested", json!({ "dealId": deal.id })),
        )
        .await;

    let message = match req.response {
        RequestResponse::Accepted => "Deal accepted successfully",
        RequestResponse::Declined => "Deal declined successfully",
    };
    Ok(success(message, json!({ "deal": deal })))
}

/// `PATCH /api/v1/deals/cancelDeal`
pub async fn cancel(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<CancelRequest>,
) -> ApiResult<Response> {
    let deal = state.db.cancel_deal(&gamer.id, &req.deal_id).await?;

    invalidate_deal_caches(&state, &deal).await;
    notify_seller(&state, &deal).await;

    Ok(success("Deal canceled successfully", json!({ "deal": deal })))
}

/// `DELETE /api/v1/deals/delete/{deal_id}`
pub async fn remove(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Path(deal_id): Path<String>,
) -> ApiResult<Response> {
    let deal = state.db.delete_deal(&gamer.id, &deal_id).await?;

    invalidate_deal_caches(&state, &deal).await;
    notify_seller(&state, &deal).await;

    Ok(success("Deal deleted successfully", json!({ "dealId": deal.id })))
}

/// `GET /api/v1/deals/deal/{deal_id}`
pub async fn detail(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Path(deal_id): Path<String>,
) -> ApiResult<Response> {
    let cache_key = format!("deals:detail:{deal_id}");
    if let Some(raw) = state.cache.get(&cache_key).await {
        if let Ok(deal) = serde_json::from_str::<Deal>(&raw) {
            return Ok(success("Deal fetched successfully", json!({ "deal": deal })));
        }
    }

    let deal = state.db.get_deal(&deal_id).await?;
    if deal.creator_id != gamer.id && deal.secure_id != gamer.secure_id {
        return Err(ApiError::Forbidden(
            "You don't have permission to view this deal".into(),
        ));
    }

    if let Ok(raw) = serde_json::to_string(&deal) {
        state.cache.set(&cache_key, raw, DEAL_CACHE_TTL).await;
    }
    Ok(success("Deal fetched successfully", json!({ "deal": deal })))
}

/// `GET /api/v1/deals/user_requests` — deals addressed to the caller as
/// seller, paginated.
pub async fn user_requests(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let cache_key = format!("deals:seller:{}:{page}:{limit}", gamer.secure_id);

    if let Some(raw) = state.cache.get(&cache_key).await {
        if let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) {
            return Ok(success("Deals fetched successfully", data));
        }
    }

    let (deals, total) = state.db.list_seller_deals(&gamer.secure_id, page, limit).await?;
    let data = json!({
        "deals": deals,
        "pagination": Pagination::new(page, limit, total),
    });

    if let Ok(raw) = serde_json::to_string(&data) {
        state.cache.set(&cache_key, raw, DEAL_CACHE_TTL).await;
    }
    Ok(success("Deals fetched successfully", data))
}

/// `GET /api/v1/deals/user_deals` — deals the caller participates in on
/// either side, paginated.
pub async fn user_deals(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let (page, limit) = clamp_pagination(query.page, query.limit);
    let cache_key = format!("deals:user:{}:{page}:{limit}", gamer.id);

    if let Some(raw) = state.cache.get(&cache_key).await {
        if let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) {
            return Ok(success("Deals fetched successfully", data));
        }
    }

    let (deals, total) = state
        .db
        .list_user_deals(Some(&gamer.id), Some(&gamer.secure_id), page, limit)
        .await?;
    let data = json!({
        "deals": deals,
        "pagination": Pagination::new(page, limit, total),
    });

    if let Ok(raw) = serde_json::to_string(&data) {
        state.cache.set(&cache_key, raw, DEAL_CACHE_TTL).await;
    }
    Ok(success("Deals fetched successfully", data))
}
