//! Core domain types and error definitions for hako.
//!
//! This crate provides the types shared across the hako service:
//!
//! - [`User`] and [`Item`] — Stored records
//! - [`NewUser`] and [`NewItem`] — Creation requests, with field validation
//! - [`Page`] — `skip`/`limit` window for list queries
//! - [`CoreError`] — Validation failures
//!
//! # Example
//!
//! ```rust
//! use hako_core::{NewItem, Page};
//!
//! let item = NewItem {
//!     title: "Notebook".to_string(),
//!     description: Some("A5, dotted".to_string()),
//! };
//! assert!(item.validate().is_ok());
//!
//! let page = Page::default();
//! assert_eq!((page.skip, page.limit), (0, 100));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a user's email, in characters.
pub const EMAIL_MAX_LEN: usize = 100;
/// Maximum length of a stored password hash, in characters.
pub const PASSWORD_HASH_MAX_LEN: usize = 100;
/// Maximum length of an item title, in characters.
pub const TITLE_MAX_LEN: usize = 30;
/// Maximum length of an item description, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 30;

/// Default number of rows returned by list queries.
pub const DEFAULT_LIMIT: i64 = 100;

const FAKE_HASH_SUFFIX: &str = "notreallyhashed";

/// Errors raised while validating incoming data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl CoreError {
    fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
}

/// An item owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
}

/// Request to register a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), CoreError> {
        check_text("email", &self.email, EMAIL_MAX_LEN)?;
        let hashed_len = fake_hash_password(&self.password).chars().count();
        if hashed_len > PASSWORD_HASH_MAX_LEN {
            return Err(CoreError::validation(
                "password",
                format!(
                    "must be at most {} characters",
                    PASSWORD_HASH_MAX_LEN - FAKE_HASH_SUFFIX.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Request to create an item for a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), CoreError> {
        check_text("title", &self.title, TITLE_MAX_LEN)?;
        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(CoreError::validation(
                    "description",
                    format!("must be at most {} characters", DESCRIPTION_MAX_LEN),
                ));
            }
        }
        Ok(())
    }
}

/// Offset/limit window applied to list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// Rejects negative values; SQLite would read a negative LIMIT as "no limit".
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.skip < 0 {
            return Err(CoreError::validation("skip", "must not be negative"));
        }
        if self.limit < 0 {
            return Err(CoreError::validation("limit", "must not be negative"));
        }
        Ok(())
    }
}

/// Placeholder password "hash". Not a security measure.
pub fn fake_hash_password(password: &str) -> String {
    format!("{password}{FAKE_HASH_SUFFIX}")
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    if value.chars().count() > max {
        return Err(CoreError::validation(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}
