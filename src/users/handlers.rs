use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use secrecy::ExposeSecret;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ChangePasswordRequest, LoginRequest, LoginResponse, StatusResponse, UserInput},
    repo::User,
};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/login", post(login))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/password", put(change_password))
}

/// Only the account owner may modify it.
fn ensure_owner(caller: Uuid, id: Uuid) -> Result<(), AppError> {
    if caller != id {
        warn!(%caller, %id, "caller does not own the account");
        return Err(AppError::Forbidden("Not allowed to modify another user".into()));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(input) = payload?;
    let user = state.users.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let nickname = payload.nickname.trim();
    if nickname.is_empty() || payload.password.expose_secret().is_empty() {
        return Err(AppError::BadRequest("nickname and password are required".into()));
    }

    match state.users.login(nickname, payload.password).await {
        Ok(token) => Ok(Json(LoginResponse { token })),
        // do not reveal which nicknames exist
        Err(AppError::NotFound(_)) => {
            warn!(nickname, "login unknown nickname");
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
        Err(e) => Err(e),
    }
}

#[instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.users.get_user(id).await?))
}

#[instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = path?;
    ensure_owner(caller, id)?;
    let Json(input) = payload?;
    Ok(Json(state.users.update_user(id, input).await?))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Path(id) = path?;
    ensure_owner(caller, id)?;
    let Json(body) = payload?;
    state
        .users
        .change_password(id, body.existing_password, body.new_password)
        .await?;
    Ok(Json(StatusResponse::ok()))
}

#[instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Path(id) = path?;
    state.users.delete_user(id).await?;
    Ok(Json(StatusResponse::ok()))
}
