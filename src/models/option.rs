//! Option lists for selection controls

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// An `(id, label)` pair used to populate a select control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SelectOption {
    pub id: i32,
    pub label: String,
}

impl SelectOption {
    pub fn new(id: i32, label: impl Into<String>) -> Self {
        Self { id, label: label.into() }
    }
}
