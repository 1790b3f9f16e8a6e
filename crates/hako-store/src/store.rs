//! SQLite-backed user and item storage.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use hako_core::{fake_hash_password, Item, NewItem, NewUser, Page, User};
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock error")]
    Lock,
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    #[error("Owner not found: {0}")]
    OwnerNotFound(i64),
}

const USER_COLUMNS: &str = "id, email, hashed_password, is_active";
const ITEM_COLUMNS: &str = "id, title, description, owner_id";

/// Owner ids bound per `IN (...)` query. Below the 999 limit of older SQLite builds.
pub const OWNER_BATCH_SIZE: usize = 500;

/// SQLite-backed storage for users and items.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Opens (or creates) the database file at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>, sql_echo: bool) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn, sql_echo)?;
        info!("Database initialized at {}", path.display());
        Ok(store)
    }

    /// Creates an in-memory store.
    pub fn in_memory(sql_echo: bool) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, sql_echo)
    }

    fn with_connection(mut conn: Connection, sql_echo: bool) -> Result<Self, StoreError> {
        if sql_echo {
            conn.trace(Some(log_sql as fn(&str)));
        }
        crate::schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    /// Retrieves a user by id.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        find_user(&conn, "id = ?1", params![user_id])
    }

    /// Retrieves a user by email.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.lock()?;
        find_user(&conn, "email = ?1", params![email])
    }

    /// Lists users ordered by id.
    pub fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![page.limit, page.skip], user_from_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Registers a user. The email must not already be registered.
    pub fn create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let conn = self.lock()?;

        if find_user(&conn, "email = ?1", params![new_user.email])?.is_some() {
            return Err(StoreError::EmailTaken(new_user.email.clone()));
        }

        let hashed_password = fake_hash_password(&new_user.password);
        let id = insert_user(&conn, &new_user.email, &hashed_password)?;

        let user = User {
            id,
            email: new_user.email.clone(),
            hashed_password,
            is_active: true,
        };
        info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Lists items ordered by id.
    pub fn list_items(&self, page: Page) -> Result<Vec<Item>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![page.limit, page.skip], item_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Gets all items owned by a user.
    pub fn items_for_owner(&self, owner_id: i64) -> Result<Vec<Item>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![owner_id], item_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Gets the items of several users at once, keyed by owner id.
    ///
    /// Owners without items are absent from the map. Ids are bound in batches
    /// of [`OWNER_BATCH_SIZE`] to stay under SQLite's bound-parameter limit.
    pub fn items_for_owners(&self, owner_ids: &[i64]) -> Result<HashMap<i64, Vec<Item>>, StoreError> {
        let mut grouped: HashMap<i64, Vec<Item>> = HashMap::new();
        if owner_ids.is_empty() {
            return Ok(grouped);
        }

        let conn = self.lock()?;
        for batch in owner_ids.chunks(OWNER_BATCH_SIZE) {
            let placeholders = vec!["?"; batch.len()].join(", ");
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE owner_id IN ({placeholders}) ORDER BY id"
            ))?;
            let rows = stmt.query_map(params_from_iter(batch.iter()), item_from_row)?;

            for row in rows {
                let item = row?;
                grouped.entry(item.owner_id).or_default().push(item);
            }
        }
        Ok(grouped)
    }

    /// Creates an item owned by `owner_id`.
    pub fn create_item(&self, owner_id: i64, new_item: &NewItem) -> Result<Item, StoreError> {
        let conn = self.lock()?;

        if find_user(&conn, "id = ?1", params![owner_id])?.is_none() {
            return Err(StoreError::OwnerNotFound(owner_id));
        }

        conn.execute(
            "INSERT INTO items (title, description, owner_id) VALUES (?1, ?2, ?3)",
            params![new_item.title, new_item.description, owner_id],
        )
        .map_err(|e| match constraint_kind(&e) {
            Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => StoreError::OwnerNotFound(owner_id),
            _ => e.into(),
        })?;

        let item = Item {
            id: conn.last_insert_rowid(),
            title: new_item.title.clone(),
            description: new_item.description.clone(),
            owner_id,
        };
        info!("Created item {} for user {}", item.id, owner_id);
        Ok(item)
    }
}

fn find_user(
    conn: &Connection,
    predicate: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Option<User>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}");
    let user = conn.query_row(&sql, params, user_from_row).optional()?;
    Ok(user)
}

/// Inserts an active user, mapping a UNIQUE violation on email to `EmailTaken`.
fn insert_user(conn: &Connection, email: &str, hashed_password: &str) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO users (email, hashed_password, is_active) VALUES (?1, ?2, ?3)",
        params![email, hashed_password, true],
    )
    .map_err(|e| match constraint_kind(&e) {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => StoreError::EmailTaken(email.to_string()),
        _ => e.into(),
    })?;
    Ok(conn.last_insert_rowid())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        is_active: row.get(3)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
    })
}

/// Extended result code of a constraint violation, if `e` is one.
fn constraint_kind(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Some(err.extended_code)
        }
        _ => None,
    }
}

fn log_sql(sql: &str) {
    debug!(target: "hako_store::sql", "{}", sql);
}
