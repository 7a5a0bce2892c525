//! Members repository (catalog store)

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberRanking},
};

const ACTIVE_EMAIL_INDEX: &str = "members_active_email_key";

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Create a member. Emails are unique (case-insensitive) among active members.
    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            "INSERT INTO members (name, email, phone) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate =
                e.as_database_error().and_then(|d| d.constraint()) == Some(ACTIVE_EMAIL_INDEX);
            if duplicate {
                AppError::Conflict(format!("Email {} already exists", data.email))
            } else {
                AppError::from(e)
            }
        })
    }

    /// Members ordered by total loan count, zero-loan members included.
    ///
    /// Equal counts are ordered by id so results are stable.
    pub async fn top_by_loan_count(&self, limit: i64) -> AppResult<Vec<MemberRanking>> {
        let rows = sqlx::query_as::<_, MemberRanking>(
            r#"
            SELECT m.*, COUNT(l.id) AS loan_count
            FROM members m
            LEFT JOIN borrowed_books l ON l.member_id = m.id
            WHERE m.deleted_at IS NULL
            GROUP BY m.id
            ORDER BY loan_count DESC, m.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
