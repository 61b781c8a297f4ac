//! Author model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::option::SelectOption;

/// Author record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    /// Optimistic concurrency token, bumped on every update
    pub version: i32,
}

impl Author {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn to_option(&self) -> SelectOption {
        SelectOption::new(self.id, self.full_name())
    }
}

/// Create/update author form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 80, message = "First name is required and must be at most 80 characters."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80, message = "Last name is required and must be at most 80 characters."))]
    pub last_name: String,
}

impl AuthorInput {
    /// Trim surrounding whitespace before validation
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        }
    }
}
