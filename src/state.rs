use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{QuoteStore, UserStore};
use crate::services::{AuthService, TokenService, TotpService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーストア
    pub users: Arc<dyn UserStore>,
    /// 名言ストア
    pub quotes: Arc<dyn QuoteStore>,
    /// 認証サービス
    pub auth_service: AuthService,
    /// アクセストークンサービス
    pub token_service: TokenService,
    /// TOTPサービス
    pub totp_service: TotpService,
}

impl AppState {
    /// 新しい AppState を作成
    ///
    /// JWT・暗号化キーの設定不備はここでエラーになる（起動時に失敗させる）
    pub fn new(
        users: Arc<dyn UserStore>,
        quotes: Arc<dyn QuoteStore>,
        config: Config,
    ) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let auth_service = AuthService::new(users.clone());
        let token_service = TokenService::new(
            config.jwt_secret.expose_secret(),
            config.jwt_expiration_time,
        )?;
        let totp_service = TotpService::new(
            config.two_factor_authentication_app_name.clone(),
            config.two_factor_encryption_key.expose_secret(),
            users.clone(),
        )?;

        Ok(Self {
            config,
            users,
            quotes,
            auth_service,
            token_service,
            totp_service,
        })
    }
}
