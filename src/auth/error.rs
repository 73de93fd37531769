// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Internally the variants stay distinct so logs can tell a forged token
//! from an expired one. The HTTP response is deliberately uniform: every
//! authentication failure produces the same 401 body, so the API never
//! acts as an oracle for which part of a credential was wrong.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::tokens::TokenError;

/// Authentication failure observed while handling a request.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// The access token failed validation (any reason)
    InvalidToken(TokenError),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Log the specific cause, respond with the uniform body.
        match &self {
            AuthError::MissingAuthHeader => {
                tracing::debug!("auth rejected: missing authorization header")
            }
            AuthError::InvalidAuthHeader => {
                tracing::debug!("auth rejected: malformed authorization header")
            }
            AuthError::InvalidToken(cause) => {
                tracing::debug!(cause = %cause, "auth rejected: access token invalid")
            }
        }

        let body = Json(AuthErrorBody {
            error: "invalid or expired credentials".to_string(),
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
