//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Catalog entry. `available_quantity` is the number of copies on the shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: i32,
    #[sqlx(rename = "quantity")]
    pub available_quantity: i32,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_quantity > 0
    }

    /// Case-insensitive substring match on title/author, substring on year/id
    pub fn matches(&self, needle: &str) -> bool {
        let lower = needle.to_lowercase();
        self.title.to_lowercase().contains(&lower)
            || self.author.to_lowercase().contains(&lower)
            || self.year.to_string().contains(needle)
            || self.id.to_string().contains(needle)
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} by {} ({})", self.title, self.author, self.year)
    }
}

/// Book metadata submitted on create/update
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate, ToSchema)]
pub struct BookData {
    #[validate(length(min = 1, message = "Book title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Book author must not be empty"))]
    pub author: String,
    pub year: i32,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub available_quantity: i32,
}

impl BookData {
    /// Trim surrounding whitespace before validation and storage
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            ..self
        }
    }
}

/// Free-text search query
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Text to look for
    pub q: Option<String>,
}
