//! Login handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use rollcall_common::{
    auth::{self, Role},
    db::Repository,
    errors::{AppError, Result},
};

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Login response
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Authenticate with email + password, returning a bearer token valid for
/// seven days
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());

    let user = repo
        .find_user_by_email(&request.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let role: Role = user.role.parse().map_err(|_| AppError::Internal {
        message: format!("Account {} has a corrupt role", user.id),
    })?;

    let token = state.jwt.generate_token(user.id, &user.email, role)?;

    tracing::info!(user_id = %user.id, role = %role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
            role,
        },
    }))
}
