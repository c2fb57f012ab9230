use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::password,
    error::{AppError, AppResult},
    models::{NewUser, User},
    schema::users::dsl,
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub account_type: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: String,
    pub account_type: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub account_type: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            account_type: user.account_type,
        }
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserResponse,
}

/// Stateless credential check: no token, no session, no lockout. The caller
/// gets a yes with the user record, or a no with the reason.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;

    let user: User = match dsl::users
        .filter(dsl::username.eq(&payload.username))
        .filter(dsl::account_type.eq(&payload.account_type))
        .first(&mut conn)
    {
        Ok(user) => user,
        Err(diesel::result::Error::NotFound) => {
            return Err(AppError::not_found("User not found"));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    let valid =
        password::verify_password(&payload.password, &user.password_hash).map_err(AppError::from)?;
    if !valid {
        warn!(username = %payload.username, "login rejected: password mismatch");
        return Err(AppError::unauthorized("Incorrect password"));
    }

    info!(username = %user.username, account_type = %user.account_type, "login succeeded");
    Ok(Json(LoginResponse {
        success: true,
        user: user.into(),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password must not be empty"));
    }

    let row = NewUser {
        username: payload.username.trim().to_string(),
        password_hash: password::hash_password(&payload.password)?,
        role: payload.role,
        account_type: payload.account_type,
    };

    let mut conn = state.db()?;
    match diesel::insert_into(dsl::users).values(&row).execute(&mut conn) {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::conflict("username already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let user: User = dsl::users
        .filter(dsl::username.eq(&row.username))
        .first(&mut conn)?;

    info!(username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            success: true,
            user: user.into(),
        }),
    ))
}
