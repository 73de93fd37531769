// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account signup and session endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{
    auth::{password, TokenError},
    error::ApiError,
    models::{
        LoginRequest, MessageResponse, RefreshTokenRequest, SignupRequest, TokenPairResponse,
    },
    state::AppState,
    storage::{StoreError, StoredUser, UserRepository},
};

/// Normalize an email for storage and lookup: trim, NFC, lowercase.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().nfc().collect::<String>().to_lowercase()
}

fn validate_signup(request: &SignupRequest) -> Result<(), ApiError> {
    let username = request.username.trim();
    if username.len() < 3
        || username.len() > 32
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "username must be 3-32 characters of letters, digits, or underscore",
        ));
    }

    let email = normalize_email(&request.email);
    if !email.contains('@') || email.len() < 5 {
        return Err(ApiError::bad_request("invalid email address"));
    }

    if request.phone_number.len() != 10
        || !request.phone_number.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ApiError::bad_request("phone number must be 10 digits"));
    }

    password::validate_password(&request.password)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(())
}

/// Create a new account.
#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username, email, or phone already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_signup(&request)?;

    let password_hash = password::hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))?;

    let user = StoredUser {
        user_id: Uuid::new_v4(),
        username: request.username.trim().to_string(),
        email: normalize_email(&request.email),
        phone_number: request.phone_number.clone(),
        password_hash,
        created_at: Utc::now(),
    };

    let users = UserRepository::new(&state.store);
    match users.create(&user) {
        Ok(()) => {
            tracing::info!(user_id = %user.user_id, username = %user.username, "account created");
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    message: "account created successfully".to_string(),
                }),
            ))
        }
        Err(StoreError::AlreadyExists(what)) => {
            Err(ApiError::conflict(format!("{what} is already registered")))
        }
        Err(e) => Err(ApiError::internal(format!("failed to create account: {e}"))),
    }
}

/// Log in with email and password.
///
/// Unknown email and wrong password produce the identical response.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPairResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let invalid = || ApiError::unauthorized("invalid credentials");

    let users = UserRepository::new(&state.store);
    let user = users
        .find_by_email(&normalize_email(&request.email))
        .map_err(|e| ApiError::internal(format!("lookup failed: {e}")))?
        .ok_or_else(|| {
            tracing::debug!("login rejected: unknown email");
            invalid()
        })?;

    let matches = password::verify_password(&request.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("password verification failed: {e}")))?;
    if !matches {
        tracing::debug!(user_id = %user.user_id, "login rejected: password mismatch");
        return Err(invalid());
    }

    let tokens = state
        .sessions
        .issue(user.user_id)
        .map_err(|e| ApiError::internal(format!("token issuance failed: {e}")))?;

    tracing::info!(user_id = %user.user_id, "login successful");
    Ok(Json(TokenPairResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Exchange a refresh token for a new credential pair.
///
/// The presented refresh token is rotated: it stops working the moment
/// the exchange succeeds.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New credential pair", body = TokenPairResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    match state.sessions.refresh(&request.refresh_token) {
        Ok(tokens) => Ok(Json(TokenPairResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })),
        Err(e @ (TokenError::NotFound | TokenError::Expired)) => {
            tracing::debug!(cause = %e, "refresh rejected");
            Err(ApiError::unauthorized("invalid or expired credentials"))
        }
        Err(e) => Err(ApiError::internal(format!("refresh failed: {e}"))),
    }
}

/// Revoke a refresh token (logout). Idempotent.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .sessions
        .revoke(&request.refresh_token)
        .map_err(|e| ApiError::internal(format!("logout failed: {e}")))?;

    Ok(Json(MessageResponse {
        message: "logged out".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_request() -> SignupRequest {
        SignupRequest {
            username: "satoshi".to_string(),
            email: "Satoshi@Example.com".to_string(),
            phone_number: "5551234567".to_string(),
            password: "Str0ng!pass".to_string(),
        }
    }

    #[tokio::test]
    async fn signup_login_refresh_logout_flow() {
        let (state, _dir) = AppState::for_tests();

        let (status, _) = signup(State(state.clone()), Json(signup_request()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        // Email lookup is normalized: a different case still logs in.
        let tokens = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "satoshi@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            }),
        )
        .await
        .unwrap();

        let rotated = refresh(
            State(state.clone()),
            Json(RefreshTokenRequest {
                refresh_token: tokens.0.refresh_token.clone(),
            }),
        )
        .await
        .unwrap();

        // The pre-rotation token is dead.
        let replay = refresh(
            State(state.clone()),
            Json(RefreshTokenRequest {
                refresh_token: tokens.0.refresh_token.clone(),
            }),
        )
        .await;
        assert_eq!(replay.unwrap_err().status, StatusCode::UNAUTHORIZED);

        logout(
            State(state.clone()),
            Json(RefreshTokenRequest {
                refresh_token: rotated.0.refresh_token.clone(),
            }),
        )
        .await
        .unwrap();

        // Revoked: the rotated token no longer refreshes.
        let after_logout = refresh(
            State(state),
            Json(RefreshTokenRequest {
                refresh_token: rotated.0.refresh_token,
            }),
        )
        .await;
        assert_eq!(after_logout.unwrap_err().status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let (state, _dir) = AppState::for_tests();
        signup(State(state.clone()), Json(signup_request()))
            .await
            .unwrap();

        let err = signup(State(state), Json(signup_request()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let (state, _dir) = AppState::for_tests();
        signup(State(state.clone()), Json(signup_request()))
            .await
            .unwrap();

        let unknown = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            }),
        )
        .await
        .unwrap_err();

        let wrong = login(
            State(state),
            Json(LoginRequest {
                email: "satoshi@example.com".to_string(),
                password: "Wr0ng!pass1".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(unknown.status, wrong.status);
        assert_eq!(unknown.message, wrong.message);
    }

    #[tokio::test]
    async fn weak_password_is_rejected_before_storage() {
        let (state, _dir) = AppState::for_tests();
        let mut request = signup_request();
        request.password = "weak".to_string();

        let err = signup(State(state.clone()), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        // Nothing was created: the proper signup still succeeds.
        signup(State(state), Json(signup_request())).await.unwrap();
    }

    #[test]
    fn email_normalization_is_idempotent() {
        assert_eq!(normalize_email("  Satoshi@Example.COM "), "satoshi@example.com");
        assert_eq!(
            normalize_email(&normalize_email("Satoshi@Example.com")),
            normalize_email("Satoshi@Example.com")
        );
    }
}
