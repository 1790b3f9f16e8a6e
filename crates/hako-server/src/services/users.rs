//! Assembles user responses from the store.

use hako_core::{NewUser, Page};

use crate::dto::UserResponse;
use crate::error::AppError;
use crate::ServerState;

/// Registers a user. New users never own items yet.
pub fn create_user(state: &ServerState, req: &NewUser) -> Result<UserResponse, AppError> {
    req.validate()?;
    let user = state.store.create_user(req)?;
    Ok(UserResponse::new(user, Vec::new()))
}

/// Loads one user together with its items.
pub fn get_user(state: &ServerState, user_id: i64) -> Result<UserResponse, AppError> {
    let user = state
        .store
        .get_user(user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let items = state.store.items_for_owner(user.id)?;
    Ok(UserResponse::new(user, items))
}

/// Loads a page of users, attaching items with a single batched query.
pub fn list_users(state: &ServerState, page: Page) -> Result<Vec<UserResponse>, AppError> {
    page.validate()?;
    let users = state.store.list_users(page)?;
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    let mut items = state.store.items_for_owners(&ids)?;

    Ok(users
        .into_iter()
        .map(|user| {
            let owned = items.remove(&user.id).unwrap_or_default();
            UserResponse::new(user, owned)
        })
        .collect())
}
