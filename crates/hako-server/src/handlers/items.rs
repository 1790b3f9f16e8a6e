use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use hako_core::Page;

use crate::dto::ItemResponse;
use crate::error::AppError;
use crate::ServerState;

/// GET /items/ - List items across all users.
pub async fn list(
    State(state): State<Arc<ServerState>>,
    page: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let Query(page) = page?;
    page.validate()?;

    let items = state.store.list_items(page)?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}
