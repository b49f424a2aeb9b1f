use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ユーザー
///
/// 2FAシークレットは AES-256-GCM で暗号化されて保存される
/// 平文シークレットはログに出力禁止
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub two_factor_secret: Option<Vec<u8>>,
    pub is_two_factor_enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// 二要素認証の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorState {
    /// シークレット未生成
    NoSecret,
    /// シークレット生成済み、確認コード待ち
    PendingConfirmation,
    /// 有効化済み
    Enabled,
}

impl User {
    pub fn two_factor_state(&self) -> TwoFactorState {
        match (&self.two_factor_secret, self.is_two_factor_enabled) {
            (Some(_), true) => TwoFactorState::Enabled,
            (Some(_), false) => TwoFactorState::PendingConfirmation,
            (None, _) => TwoFactorState::NoSecret,
        }
    }
}
