//! User HTTP handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use hako_core::{NewItem, NewUser, Page};
use tracing::{info, warn};

use crate::dto::{ItemResponse, UserResponse};
use crate::error::AppError;
use crate::services::users as user_service;
use crate::ServerState;

/// POST /users/ - Register a user.
pub async fn create(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(req) = payload?;
    info!("Creating user: {}", req.email);

    let user = user_service::create_user(&state, &req).map_err(|e| {
        warn!("Failed to create user {}: {:?}", req.email, e);
        e
    })?;

    Ok(Json(user))
}

/// GET /users/ - List users with their items.
pub async fn list(
    State(state): State<Arc<ServerState>>,
    page: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let Query(page) = page?;
    let users = user_service::list_users(&state, page)?;
    Ok(Json(users))
}

/// GET /users/{user_id} - Get a single user with its items.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Path(user_id) = user_id?;
    let user = user_service::get_user(&state, user_id)?;
    Ok(Json(user))
}

/// POST /users/{user_id}/items/ - Create an item owned by the user.
pub async fn create_item(
    State(state): State<Arc<ServerState>>,
    user_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<Json<ItemResponse>, AppError> {
    let Path(user_id) = user_id?;
    let Json(req) = payload?;
    req.validate()?;

    info!("Creating item '{}' for user {}", req.title, user_id);
    let item = state.store.create_item(user_id, &req)?;
    Ok(Json(item.into()))
}
