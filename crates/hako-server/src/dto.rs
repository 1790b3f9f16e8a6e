use hako_core::{Item, User};
use serde::{Deserialize, Serialize};

// === HTTP DTOs ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            owner_id: item.owner_id,
        }
    }
}

/// User as returned to clients. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    #[serde(default)]
    pub items: Vec<ItemResponse>,
}

impl UserResponse {
    pub fn new(user: User, items: Vec<Item>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            items: items.into_iter().map(ItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
