//! Transaction recording handler.

use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extract::AuthGamer;
use crate::error::{ApiResult, Body};
use crate::realtime::Event;
use crate::storage::NewTransaction;
use crate::storage::status::Currency;

use super::{AppState, created};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub deal_id: String,
    pub tx_hash: String,
    pub amount: f64,
    pub currency: Currency,
    pub sender_address: String,
}

/// `POST /api/v1/transactions/create` — record an escrow payment, move the
/// deal to "in progress", and debit the payer's escrow balance, atomically.
pub async fn create(
    State(state): State<AppState>,
    AuthGamer(gamer): AuthGamer,
    Body(req): Body<CreateTransactionRequest>,
) -> ApiResult<Response> {
    let (record, deal) = state
        .db
        .create_transaction(NewTransaction {
            deal_id: req.deal_id,
            user_id: gamer.id.clone(),
            tx_hash: req.tx_hash,
            amount: req.amount,
            currency: req.currency,
            sender_address: req.sender_address,
        })
        .await?;

    // The deal changed under every cached listing it appears in.
    state
        .cache
        .invalidate_prefix(&format!("deals:seller:{}", deal.secure_id))
        .await;
    state.cache.invalidate_prefix("deals:user:").await;
    state.cache.remove(&format!("deals:detail:{}", deal.id)).await;

    if let Ok(Some(seller)) = state.db.get_gamer_by_secure_id(&deal.secure_id).await {
        state
            .registry
            .emit_to_user(
                &seller.id,
                &Event::new("sync_requested", json!({ "dealId": deal.id })),
            )
            .await;
    }

    Ok(created(
        "Transaction recorded successfully",
        json!({ "transaction": record, "deal": deal }),
    ))
}
