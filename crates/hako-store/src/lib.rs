//! SQLite persistence for users and their items.

mod schema;
mod store;

pub use store::{StoreError, UserStore, OWNER_BATCH_SIZE};
