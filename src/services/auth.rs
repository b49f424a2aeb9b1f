use std::sync::{Arc, OnceLock};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::UserStore;

/// ユーザー不在時のタイミング攻撃対策用ダミーハッシュ（初回利用時に生成）
fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| hash_password("dummy-password-for-timing").ok())
        .as_deref()
}

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// 認証サービス
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// ユーザー登録
    ///
    /// パスワードは即座にハッシュ化し、平文は保持しない
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(password)?;
        let user = self.users.create_user(email, name, &password_hash).await?;

        tracing::info!(user_id = %user.id, "ユーザー登録成功");

        Ok(user)
    }

    /// ユーザー認証を実行
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(password, hash);
            }
            tracing::warn!(email = %email, "認証失敗: ユーザー不在");
            return Err(AppError::Authentication("invalid_credentials".to_string()));
        };

        if verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "認証成功");
            Ok(user)
        } else {
            tracing::warn!(email = %email, "認証失敗: パスワード不一致");
            Err(AppError::Authentication("invalid_credentials".to_string()))
        }
    }
}

/// パスワードを検証
fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
