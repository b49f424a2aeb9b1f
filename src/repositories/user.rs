use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::UserStore;
use crate::error::AppError;
use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    /// メールアドレスでユーザーを検索
    ///
    /// # Note
    /// DB セットアップ後は `query_as!` マクロに変更してコンパイル時SQL検証を有効にすること
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, two_factor_secret,
                   is_two_factor_enabled, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, two_factor_secret,
                   is_two_factor_enabled, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// 新しいユーザーを作成
    ///
    /// UNIQUE制約違反（users_email_key）は `AppError::EmailAlreadyExists` に変換
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, two_factor_secret,
                      is_two_factor_enabled, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("users_email_key")
            {
                return AppError::EmailAlreadyExists;
            }
            AppError::Database(e)
        })
    }

    /// 2FAシークレットを保存
    ///
    /// # Note
    /// 再登録時は未確認のシークレットを上書きする
    async fn set_two_factor_secret(&self, secret: &[u8], id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_secret = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(secret)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 2FAを有効化（検証に使ったシークレットのままの場合のみ）
    async fn set_two_factor_enabled(&self, id: Uuid, secret: &[u8]) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_two_factor_enabled = true, updated_at = NOW()
            WHERE id = $1 AND two_factor_secret = $2
            "#,
        )
        .bind(id)
        .bind(secret)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
