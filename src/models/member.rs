//! Member model and related types

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::enums::{MemberStatus, MemberType};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3}-\d{3}-\d{4}|\d{10})$").expect("valid phone regex"));

/// Registered borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub member_type: MemberType,
    pub join_date: NaiveDate,
    pub status: MemberStatus,
}

impl Member {
    /// Case-insensitive substring match on contact fields, substring on id
    pub fn matches(&self, needle: &str) -> bool {
        let lower = needle.to_lowercase();
        self.name.to_lowercase().contains(&lower)
            || self.email.to_lowercase().contains(&lower)
            || self.phone.to_lowercase().contains(&lower)
            || self.address.to_lowercase().contains(&lower)
            || self.id.to_string().contains(needle)
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number should be 10 digits or in format XXX-XXX-XXXX".into());
        Err(err)
    }
}

/// Member data submitted on registration or edit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate, ToSchema)]
pub struct MemberData {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(regex(path = *EMAIL_RE, message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: String,
    #[serde(default)]
    pub member_type: MemberType,
    /// Only honoured on update; new members always start ACTIVE
    #[serde(default)]
    pub status: Option<MemberStatus>,
}

impl MemberData {
    /// Trim text fields and canonicalize the email so uniqueness is case-insensitive
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            ..self
        }
    }
}

/// A member row ready for insertion
#[derive(Debug, Clone)]
pub struct NewMember {
    pub data: MemberData,
    pub join_date: NaiveDate,
    pub status: MemberStatus,
}
