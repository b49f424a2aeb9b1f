use async_trait::async_trait;
use sqlx::PgPool;

use super::QuoteStore;
use crate::error::AppError;
use crate::models::Quote;

#[derive(Clone)]
pub struct QuoteRepository {
    pool: PgPool,
}

impl QuoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteStore for QuoteRepository {
    async fn create(&self, content: &str, author: &str) -> Result<Quote, AppError> {
        let quote = sqlx::query_as::<_, Quote>(
            r#"
            INSERT INTO quotes (content, author)
            VALUES ($1, $2)
            RETURNING id, content, author, created_at, updated_at
            "#,
        )
        .bind(content)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        Ok(quote)
    }

    async fn find_all(&self) -> Result<Vec<Quote>, AppError> {
        let quotes = sqlx::query_as::<_, Quote>(
            r#"
            SELECT id, content, author, created_at, updated_at
            FROM quotes
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(quotes)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Quote>, AppError> {
        let quote = sqlx::query_as::<_, Quote>(
            r#"
            SELECT id, content, author, created_at, updated_at
            FROM quotes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quote)
    }

    /// 部分更新（NULL のパラメータは既存値を維持）
    async fn update(
        &self,
        id: i32,
        content: Option<&str>,
        author: Option<&str>,
    ) -> Result<Option<Quote>, AppError> {
        let quote = sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quotes
            SET content = COALESCE($2, content),
                author = COALESCE($3, author),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, content, author, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(author)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quote)
    }

    async fn delete(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM quotes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
