pub mod memory;
pub mod quote;
pub mod user;

pub use memory::MemoryStore;
pub use quote::QuoteRepository;
pub use user::UserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Quote, User};

/// ユーザー永続化の境界
///
/// PostgreSQL 実装（[`UserRepository`]）とインメモリ実装（[`MemoryStore`]）がある。
/// 各更新は単一行への1回の書き込みで完結する。
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// # Errors
    /// メールアドレス重複時は `AppError::EmailAlreadyExists`
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, AppError>;

    /// 暗号化済み2FAシークレットを保存（有効化フラグは変更しない）
    async fn set_two_factor_secret(&self, secret: &[u8], id: Uuid) -> Result<(), AppError>;

    /// 保存済みシークレットが `secret` と一致する場合のみ2FAを有効化
    ///
    /// 検証後にシークレットが差し替えられていれば `false`
    async fn set_two_factor_enabled(&self, id: Uuid, secret: &[u8]) -> Result<bool, AppError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn create(&self, content: &str, author: &str) -> Result<Quote, AppError>;

    async fn find_all(&self) -> Result<Vec<Quote>, AppError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Quote>, AppError>;

    /// `None` のフィールドは変更しない。対象がなければ `Ok(None)`
    async fn update(
        &self,
        id: i32,
        content: Option<&str>,
        author: Option<&str>,
    ) -> Result<Option<Quote>, AppError>;

    /// 削除した場合 `true`
    async fn delete(&self, id: i32) -> Result<bool, AppError>;
}
