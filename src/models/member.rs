//! Library member model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Member record. Email is unique across active members.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Create member request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateMember {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Member with their historical loan count
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MemberRanking {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub member: Member,
    /// Open and returned loans
    pub loan_count: i64,
}
