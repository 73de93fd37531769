// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints: signature-proof binding, address lookup, balances,
//! and gas estimation. All ledger reads go through the shared client and
//! stay in integer base units until formatted for display.

use alloy::primitives::U256;
use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::Auth,
    binder::{BindError, WalletBinder},
    error::ApiError,
    ledger::{format_units, parse_address, LedgerError, SignatureError},
    models::{
        AddressListResponse, BalanceResponse, ConnectWalletRequest, ConnectWalletResponse,
        EstimateGasRequest, EstimateGasResponse, WalletAddress, WalletBalancesResponse,
    },
    state::AppState,
    storage::BindingRepository,
};

fn ledger_error(e: LedgerError) -> ApiError {
    match e {
        LedgerError::InvalidAddress(msg) | LedgerError::InvalidTxHash(msg) => {
            ApiError::bad_request(msg)
        }
        LedgerError::NotFound(msg) => ApiError::not_found(msg),
        LedgerError::InvalidRpcUrl(msg) | LedgerError::Unavailable(msg) => {
            ApiError::service_unavailable(msg)
        }
    }
}

fn binding_lookup_error(e: BindError) -> ApiError {
    match e {
        // The token outlived its account.
        BindError::UserNotFound => ApiError::unauthorized("invalid credentials"),
        other => ApiError::internal(format!("lookup failed: {other}")),
    }
}

/// Bind a wallet by verifying a signed message.
#[utoipa::path(
    post,
    path = "/v1/wallet/connect",
    tag = "Wallet",
    request_body = ConnectWalletRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Wallet bound", body = ConnectWalletResponse),
        (status = 400, description = "Malformed signature"),
        (status = 401, description = "Unauthorized or signature verification failed"),
        (status = 409, description = "Wallet already linked to an account")
    )
)]
pub async fn connect_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ConnectWalletRequest>,
) -> Result<Json<ConnectWalletResponse>, ApiError> {
    let binder = WalletBinder::new(&state.store);
    match binder.bind(user.user_id, &request.message, &request.signature) {
        Ok(address) => Ok(Json(ConnectWalletResponse {
            wallet_address: WalletAddress(address),
        })),
        Err(BindError::Signature(SignatureError::Malformed(msg))) => {
            Err(ApiError::bad_request(format!("invalid signature: {msg}")))
        }
        Err(BindError::Signature(SignatureError::RecoveryFailed(_))) => {
            Err(ApiError::unauthorized("signature verification failed"))
        }
        Err(BindError::AlreadyBound) => Err(ApiError::conflict(
            "this wallet is already linked to an account",
        )),
        Err(BindError::UserNotFound) => Err(ApiError::unauthorized("invalid credentials")),
        Err(BindError::Store(e)) => Err(ApiError::internal(format!("failed to bind wallet: {e}"))),
    }
}

/// Addresses bound to a phone number (pay-by-phone lookup).
#[utoipa::path(
    get,
    path = "/v1/wallet/addresses/{phone_number}",
    tag = "Wallet",
    params(
        ("phone_number" = String, Path, description = "Phone number, 10 digits")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Bound addresses", body = AddressListResponse),
        (status = 400, description = "Invalid phone number"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn addresses_by_phone(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
) -> Result<Json<AddressListResponse>, ApiError> {
    if phone_number.len() != 10 || !phone_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request("phone number must be 10 digits"));
    }

    let bindings = BindingRepository::new(&state.store);
    let bound = bindings
        .list_by_phone(&phone_number)
        .map_err(|e| ApiError::internal(format!("lookup failed: {e}")))?;

    Ok(Json(AddressListResponse {
        addresses: bound
            .into_iter()
            .map(|b| WalletAddress(b.address))
            .collect(),
    }))
}

/// Balance of one bound address.
#[utoipa::path(
    get,
    path = "/v1/wallet/balance/{address}",
    tag = "Wallet",
    params(
        ("address" = String, Path, description = "Bound wallet address")
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 400, description = "Invalid address"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Address not bound to this account"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn wallet_balance(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let requested = parse_address(&address).map_err(ledger_error)?;

    let binder = WalletBinder::new(&state.store);
    let owned = binder
        .addresses_of(user.user_id)
        .map_err(binding_lookup_error)?;
    let owns = owned
        .iter()
        .any(|a| parse_address(a).map(|a| a == requested).unwrap_or(false));
    if !owns {
        return Err(ApiError::forbidden("you don't own this wallet address"));
    }

    let balance = state
        .ledger
        .balance_of(&address)
        .await
        .map_err(ledger_error)?;

    Ok(Json(BalanceResponse {
        address: WalletAddress(requested.to_checksum(None)),
        balance_wei: balance.to_string(),
        balance: format_units(balance, 18),
    }))
}

/// Balances for all of the caller's bound addresses.
#[utoipa::path(
    get,
    path = "/v1/wallet/balances",
    tag = "Wallet",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All balances", body = WalletBalancesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn wallet_balances(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WalletBalancesResponse>, ApiError> {
    let binder = WalletBinder::new(&state.store);
    let owned = binder
        .addresses_of(user.user_id)
        .map_err(binding_lookup_error)?;

    let mut wallets = Vec::with_capacity(owned.len());
    let mut total = U256::ZERO;
    for address in &owned {
        match state.ledger.balance_of(address).await {
            Ok(balance) => {
                total = total.saturating_add(balance);
                wallets.push(BalanceResponse {
                    address: WalletAddress(address.clone()),
                    balance_wei: balance.to_string(),
                    balance: format_units(balance, 18),
                });
            }
            Err(e) => {
                // One unreadable address should not hide the others.
                tracing::warn!(address = %address, error = %e, "balance lookup failed");
            }
        }
    }

    Ok(Json(WalletBalancesResponse {
        wallet_count: wallets.len(),
        total_wei: total.to_string(),
        total: format_units(total, 18),
        wallets,
    }))
}

/// Estimate gas for a planned transfer from a bound address.
#[utoipa::path(
    post,
    path = "/v1/wallet/estimate",
    tag = "Wallet",
    request_body = EstimateGasRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Gas estimate", body = EstimateGasResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Sender not bound to this account"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn estimate_gas(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<EstimateGasRequest>,
) -> Result<Json<EstimateGasResponse>, ApiError> {
    let from = parse_address(&request.from).map_err(ledger_error)?;
    parse_address(&request.to).map_err(ledger_error)?;
    let value = U256::from_str_radix(request.amount.trim(), 10)
        .map_err(|e| ApiError::bad_request(format!("invalid amount: {e}")))?;

    let binder = WalletBinder::new(&state.store);
    let owned = binder
        .addresses_of(user.user_id)
        .map_err(binding_lookup_error)?;
    let owns = owned
        .iter()
        .any(|a| parse_address(a).map(|a| a == from).unwrap_or(false));
    if !owns {
        return Err(ApiError::forbidden("sender is not bound to this account"));
    }

    let gas_limit = state
        .ledger
        .estimate_gas(&request.from, &request.to, value)
        .await
        .map_err(ledger_error)?;

    Ok(Json(EstimateGasResponse {
        gas_limit: gas_limit.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::storage::{StoredUser, UserRepository};
    use alloy::signers::{local::PrivateKeySigner, SignerSync};
    use axum::http::StatusCode;
    use chrono::Utc;
    use uuid::Uuid;

    fn seed_user(state: &AppState, phone: &str) -> AuthenticatedUser {
        let user = StoredUser {
            user_id: Uuid::new_v4(),
            username: format!("user{phone}"),
            email: format!("{phone}@example.com"),
            phone_number: phone.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            created_at: Utc::now(),
        };
        UserRepository::new(&state.store).create(&user).unwrap();
        AuthenticatedUser {
            user_id: user.user_id,
        }
    }

    fn signed(message: &str, signer: &PrivateKeySigner) -> String {
        let sig = signer.sign_message_sync(message.as_bytes()).unwrap();
        alloy::hex::encode(sig.as_bytes())
    }

    #[tokio::test]
    async fn connect_then_lookup_by_phone() {
        let (state, _dir) = AppState::for_tests();
        let user = seed_user(&state, "5551234567");
        let signer = PrivateKeySigner::random();

        let response = connect_wallet(
            Auth(user.clone()),
            State(state.clone()),
            Json(ConnectWalletRequest {
                message: "Connect wallet".to_string(),
                signature: signed("Connect wallet", &signer),
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            response.0.wallet_address.0,
            signer.address().to_checksum(None)
        );

        let listed = addresses_by_phone(
            Auth(user),
            State(state),
            Path("5551234567".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(listed.0.addresses.len(), 1);
        assert_eq!(listed.0.addresses[0], response.0.wallet_address);
    }

    #[tokio::test]
    async fn connect_conflict_maps_to_409() {
        let (state, _dir) = AppState::for_tests();
        let first = seed_user(&state, "5551234567");
        let second = seed_user(&state, "5559876543");
        let signer = PrivateKeySigner::random();

        connect_wallet(
            Auth(first),
            State(state.clone()),
            Json(ConnectWalletRequest {
                message: "Connect wallet".to_string(),
                signature: signed("Connect wallet", &signer),
            }),
        )
        .await
        .unwrap();

        let err = connect_wallet(
            Auth(second),
            State(state),
            Json(ConnectWalletRequest {
                message: "Connect wallet".to_string(),
                signature: signed("Connect wallet", &signer),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_signature_maps_to_400() {
        let (state, _dir) = AppState::for_tests();
        let user = seed_user(&state, "5551234567");

        let err = connect_wallet(
            Auth(user),
            State(state),
            Json(ConnectWalletRequest {
                message: "Connect wallet".to_string(),
                signature: "0xdeadbeef".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn balance_of_unbound_address_is_forbidden() {
        let (state, _dir) = AppState::for_tests();
        let user = seed_user(&state, "5551234567");

        let err = wallet_balance(
            Auth(user),
            State(state),
            Path("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn bound_balance_surfaces_ledger_outage_as_503() {
        // The test state's ledger endpoint is unroutable, so an
        // ownership-passing balance query must come back retryable.
        let (state, _dir) = AppState::for_tests();
        let user = seed_user(&state, "5551234567");
        let signer = PrivateKeySigner::random();

        connect_wallet(
            Auth(user.clone()),
            State(state.clone()),
            Json(ConnectWalletRequest {
                message: "Connect wallet".to_string(),
                signature: signed("Connect wallet", &signer),
            }),
        )
        .await
        .unwrap();

        let err = wallet_balance(
            Auth(user),
            State(state),
            Path(signer.address().to_checksum(None)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
