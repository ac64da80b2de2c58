//! User API endpoints
//!
//! Registration, authentication, and the contact list.

use crate::api::utils::{validate_registration, RouterState};
use crate::error::AppError;
use crate::store::Contact;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request to register a new user
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired public username
    pub handle: String,
    /// Secret to derive the stored credential digest from
    pub secret: String,
}

/// Registration outcome
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Whether a new user row was created
    pub registered: bool,
    /// Human-readable outcome message
    pub message: String,
}

/// Request to authenticate
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Public username
    pub handle: String,
    /// Secret to check against the stored digest
    pub secret: String,
}

/// Authenticated user summary
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User identifier
    pub id: i64,
    /// Public username
    pub handle: String,
    /// Unix timestamp of registration
    pub created_at: i64,
}

/// Query parameters for the contact list
#[derive(Debug, Deserialize)]
pub struct ContactsQuery {
    /// Optional user id to exclude (typically the caller)
    pub exclude: Option<i64>,
}

/// POST /api/users/register - Register a new user
///
/// A taken handle is not an error: the response carries `registered: false`
/// and the caller decides how to present it.
pub async fn register(
    State(state): State<RouterState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    validate_registration(&request.handle, &request.secret)?;

    let registered = state.store.register(&request.handle, &request.secret).await?;
    if registered {
        info!(handle = %request.handle, "User registered");
    }

    let message = if registered {
        "Registration successful".to_string()
    } else {
        "Handle is already taken".to_string()
    };

    Ok(Json(RegisterResponse {
        registered,
        message,
    }))
}

/// POST /api/users/login - Authenticate by handle and secret
///
/// Any mismatch returns the same undifferentiated 401.
pub async fn login(
    State(state): State<RouterState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .store
        .authenticate(&request.handle, &request.secret)
        .await?
        .ok_or(AppError::AuthFailed)?;

    Ok(Json(LoginResponse {
        id: user.id,
        handle: user.handle,
        created_at: user.created_at,
    }))
}

/// GET /api/users/contacts - List users alphabetically by handle
pub async fn contacts(
    State(state): State<RouterState>,
    Query(query): Query<ContactsQuery>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = state.store.list_contacts(query.exclude).await?;
    Ok(Json(contacts))
}
