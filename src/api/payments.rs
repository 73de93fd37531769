// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment endpoints.
//!
//! Submission and refresh delegate to the reconciler; reads are scoped to
//! the authenticated owner. Retryable failures (ledger outage) map to
//! 503, terminal validation failures to 422, conflicts resolve to the
//! existing resource inside the reconciler and never surface here.

use alloy::primitives::U256;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        CreatePaymentRequest, PaymentListQuery, PaymentListResponse, PaymentResponse,
        PaymentStatsResponse,
    },
    reconciler::{PaymentClaim, PaymentReconciler, ReconcileError},
    state::AppState,
    storage::{PaymentPage, PaymentRepository, PaymentStatus},
};

fn reconcile_error(e: ReconcileError) -> ApiError {
    match e {
        ReconcileError::NoWalletBound => {
            ApiError::unprocessable("no wallet addresses found for this account")
        }
        ReconcileError::InvalidClaim(msg) => ApiError::bad_request(msg),
        ReconcileError::TransactionNotFound => {
            ApiError::unprocessable("transaction not found on ledger")
        }
        ReconcileError::NotFromOwnedWallet => {
            ApiError::unprocessable("transaction is not from any of your connected wallets")
        }
        ReconcileError::ClaimMismatch(msg) => {
            ApiError::unprocessable(format!("transaction does not match the claim: {msg}"))
        }
        ReconcileError::LedgerUnavailable(msg) => {
            ApiError::service_unavailable(format!("ledger unavailable: {msg}"))
        }
        ReconcileError::PaymentNotFound => ApiError::not_found("payment not found"),
        ReconcileError::Store(e) => ApiError::internal(format!("storage failure: {e}")),
    }
}

fn reconciler<'a>(state: &'a AppState) -> PaymentReconciler<'a, crate::ledger::LedgerClient> {
    PaymentReconciler::new(
        &state.store,
        state.ledger.as_ref(),
        state.config.min_confirmations,
    )
}

/// Submit a payment claim for an on-chain transaction.
#[utoipa::path(
    post,
    path = "/v1/payments",
    tag = "Payments",
    request_body = CreatePaymentRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Payment recorded (or existing record returned)", body = PaymentResponse),
        (status = 400, description = "Malformed claim"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Claim rejected by validation"),
        (status = 503, description = "Ledger unavailable, retry later")
    )
)]
pub async fn create_payment(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let claim = PaymentClaim {
        to_address: request.to_address,
        amount: request.amount,
        currency: request.currency.unwrap_or_else(|| "ETH".to_string()),
        tx_hash: request.transaction_hash,
        description: request.description,
    };

    let payment = reconciler(&state)
        .submit(user.user_id, &claim)
        .await
        .map_err(reconcile_error)?;

    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// Fetch one payment by id.
#[utoipa::path(
    get,
    path = "/v1/payments/{payment_id}",
    tag = "Payments",
    params(
        ("payment_id" = Uuid, Path, description = "Payment id")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payment", body = PaymentResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payments = PaymentRepository::new(&state.store);
    let payment = payments
        .find_by_id(payment_id)
        .map_err(|e| ApiError::internal(format!("lookup failed: {e}")))?
        .filter(|p| p.user_id == user.user_id)
        .ok_or_else(|| ApiError::not_found("payment not found"))?;

    Ok(Json(payment.into()))
}

/// Fetch one payment by transaction hash.
#[utoipa::path(
    get,
    path = "/v1/payments/tx/{tx_hash}",
    tag = "Payments",
    params(
        ("tx_hash" = String, Path, description = "Transaction hash")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payment", body = PaymentResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment_by_tx_hash(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payments = PaymentRepository::new(&state.store);
    let payment = payments
        .find_by_tx_hash(&tx_hash)
        .map_err(|e| ApiError::internal(format!("lookup failed: {e}")))?
        .filter(|p| p.user_id == user.user_id)
        .ok_or_else(|| ApiError::not_found("payment not found"))?;

    Ok(Json(payment.into()))
}

/// List the caller's payments, newest first.
#[utoipa::path(
    get,
    path = "/v1/payments",
    tag = "Payments",
    params(PaymentListQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Paginated payments", body = PaymentListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_payments(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let payments = PaymentRepository::new(&state.store);
    let (rows, total_count) = payments
        .list_by_user(
            user.user_id,
            &PaymentPage {
                status: query.status,
                page,
                page_size,
            },
        )
        .map_err(|e| ApiError::internal(format!("listing failed: {e}")))?;

    Ok(Json(PaymentListResponse {
        payments: rows.into_iter().map(Into::into).collect(),
        total_count,
        page,
        page_size,
        total_pages: total_count.div_ceil(page_size),
    }))
}

/// Re-check a pending payment against the ledger.
#[utoipa::path(
    post,
    path = "/v1/payments/{payment_id}/refresh",
    tag = "Payments",
    params(
        ("payment_id" = Uuid, Path, description = "Payment id")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current payment state", body = PaymentResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Payment not found"),
        (status = 503, description = "Ledger unavailable, retry later")
    )
)]
pub async fn refresh_payment(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = reconciler(&state)
        .refresh(user.user_id, payment_id)
        .await
        .map_err(reconcile_error)?;

    Ok(Json(payment.into()))
}

/// Per-user payment statistics.
#[utoipa::path(
    get,
    path = "/v1/payments/stats",
    tag = "Payments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Statistics", body = PaymentStatsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn payment_stats(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<PaymentStatsResponse>, ApiError> {
    let payments = PaymentRepository::new(&state.store);
    let (rows, total_count) = payments
        .list_by_user(
            user.user_id,
            &PaymentPage {
                status: None,
                page: 1,
                page_size: usize::MAX,
            },
        )
        .map_err(|e| ApiError::internal(format!("listing failed: {e}")))?;

    let mut stats = PaymentStatsResponse {
        total_payments: total_count,
        confirmed: 0,
        pending: 0,
        failed: 0,
        total_amount: "0".to_string(),
    };

    // Full-precision integer sum of confirmed amounts.
    let mut total = U256::ZERO;
    for payment in &rows {
        match payment.status {
            PaymentStatus::Confirmed => {
                stats.confirmed += 1;
                if let Ok(amount) = U256::from_str_radix(&payment.amount, 10) {
                    total = total.saturating_add(amount);
                }
            }
            PaymentStatus::Pending => stats.pending += 1,
            PaymentStatus::Failed => stats.failed += 1,
            PaymentStatus::Cancelled => {}
        }
    }
    stats.total_amount = total.to_string();

    Ok(Json(stats))
}
