//! Library member model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::FieldErrors;

use super::option::SelectOption;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ().\-]{4,22}[0-9]$").expect("valid phone regex"));

/// Member record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub joined_on: DateTime<Utc>,
    pub version: i32,
}

impl Member {
    pub fn to_option(&self) -> SelectOption {
        SelectOption::new(self.id, self.full_name.clone())
    }
}

/// Create/update member form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MemberInput {
    #[validate(length(min = 1, max = 120, message = "Full name is required and must be at most 120 characters."))]
    pub full_name: String,
    #[validate(
        length(min = 1, message = "Email is required."),
        email(message = "Email is not a valid e-mail address.")
    )]
    pub email: String,
    pub phone: Option<String>,
}

impl MemberInput {
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        }
    }

    pub fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        if let Some(ref phone) = self.phone {
            if !PHONE_RE.is_match(phone) {
                errors.add("phone", "Phone is not a valid phone number.");
            }
        }
        errors
    }
}
