// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account-settings endpoints. Each operation re-verifies the current
//! password before mutating anything.

use axum::{extract::State, Json};

use crate::{
    auth::{password, Auth},
    error::ApiError,
    models::{ChangePasswordRequest, DeleteAccountRequest, MessageResponse, UpdateEmailRequest},
    state::AppState,
    storage::{StoreError, StoredUser, UserRepository},
};

use super::auth::normalize_email;

/// Load the caller's row and re-verify the supplied password.
///
/// Both a missing row and a mismatch produce the same generic rejection.
fn verify_current_password(
    state: &AppState,
    user_id: uuid::Uuid,
    supplied: &str,
) -> Result<StoredUser, ApiError> {
    let invalid = || ApiError::unauthorized("invalid credentials");

    let users = UserRepository::new(&state.store);
    let user = users
        .find_by_id(user_id)
        .map_err(|e| ApiError::internal(format!("lookup failed: {e}")))?
        .ok_or_else(invalid)?;

    let matches = password::verify_password(supplied, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("password verification failed: {e}")))?;
    if !matches {
        tracing::debug!(user_id = %user_id, "account operation rejected: password mismatch");
        return Err(invalid());
    }
    Ok(user)
}

/// Change the account password.
#[utoipa::path(
    put,
    path = "/v1/account/password",
    tag = "Account",
    request_body = ChangePasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password fails the complexity rules"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn change_password(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    verify_current_password(&state, user.user_id, &request.old_password)?;

    password::validate_password(&request.new_password)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let new_hash = password::hash_password(&request.new_password)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))?;

    UserRepository::new(&state.store)
        .update_password(user.user_id, &new_hash)
        .map_err(|e| ApiError::internal(format!("failed to change password: {e}")))?;

    tracing::info!(user_id = %user.user_id, "password changed");
    Ok(Json(MessageResponse {
        message: "password changed".to_string(),
    }))
}

/// Change the account email.
#[utoipa::path(
    put,
    path = "/v1/account/email",
    tag = "Account",
    request_body = UpdateEmailRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Email updated", body = MessageResponse),
        (status = 400, description = "Invalid email"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_email(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    verify_current_password(&state, user.user_id, &request.password)?;

    let new_email = normalize_email(&request.new_email);
    if !new_email.contains('@') || new_email.len() < 5 {
        return Err(ApiError::bad_request("invalid email address"));
    }

    match UserRepository::new(&state.store).update_email(user.user_id, &new_email) {
        Ok(()) => {
            tracing::info!(user_id = %user.user_id, "email updated");
            Ok(Json(MessageResponse {
                message: "email updated".to_string(),
            }))
        }
        Err(StoreError::AlreadyExists(_)) => {
            Err(ApiError::conflict("email already in use by another account"))
        }
        Err(e) => Err(ApiError::internal(format!("failed to update email: {e}"))),
    }
}

/// Delete the account.
///
/// Cascades to sessions and wallet bindings; recorded payments remain.
#[utoipa::path(
    delete,
    path = "/v1/account",
    tag = "Account",
    request_body = DeleteAccountRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn delete_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    verify_current_password(&state, user.user_id, &request.password)?;

    UserRepository::new(&state.store)
        .delete(user.user_id)
        .map_err(|e| ApiError::internal(format!("failed to delete account: {e}")))?;

    tracing::info!(user_id = %user.user_id, "account deleted");
    Ok(Json(MessageResponse {
        message: "account deleted".to_string(),
    }))
}
