use axum::{Json, extract::State, response::IntoResponse};
use garde::Validate;
use http::{HeaderMap, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::{AuthUser, ValidatedJson};
use crate::handlers::authentication::{TokenResponse, token_response};
use crate::models::TwoFactorState;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorCodeRequest {
    #[garde(length(min = 1))]
    pub two_factor_authentication_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnOnResponse {
    pub message: String,
}

// === 2FA Generate ===

/// POST /2fa/generate
///
/// 2FA登録を開始し、登録URIのQRコード（PNG）を返す
///
/// # Security
/// - シークレット平文はログ出力禁止
pub async fn generate(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let enrollment = state.totp_service.enroll(&user).await?;
    let png = state.totp_service.render_qr_code(&enrollment.otpauth_url)?;

    Ok(([(CONTENT_TYPE, "image/png")], png))
}

// === 2FA Turn On ===

/// POST /2fa/turn-on
///
/// 登録中のシークレットに対するコードを確認し、2FAを有効化
///
/// # Security
/// - コードはログ出力禁止
pub async fn turn_on(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    ValidatedJson(request): ValidatedJson<TwoFactorCodeRequest>,
) -> Result<Json<TurnOnResponse>, AppError> {
    if user.two_factor_state() == TwoFactorState::Enabled {
        return Err(AppError::TwoFactorAlreadyEnabled);
    }

    if !state
        .totp_service
        .verify(&request.two_factor_authentication_code, &user)?
    {
        tracing::warn!(user_id = %user.id, "2FA有効化失敗: コード不一致");
        return Err(AppError::WrongAuthenticationCode);
    }

    // 検証後に /2fa/generate で差し替えられたシークレットでは有効化しない
    let verified_secret = user.two_factor_secret.as_deref().unwrap_or_default();
    if !state
        .users
        .set_two_factor_enabled(user.id, verified_secret)
        .await?
    {
        tracing::warn!(user_id = %user.id, "2FA有効化失敗: シークレットが更新済み");
        return Err(AppError::WrongAuthenticationCode);
    }

    tracing::info!(user_id = %user.id, "2FA有効化完了");

    Ok(Json(TurnOnResponse {
        message: format!("2Factor Auth is enabled for user {}", user.email),
    }))
}

// === 2FA Authenticate ===

/// POST /2fa/authenticate
///
/// 2FA有効ユーザーのコードを検証し、二要素認証済みトークンを発行
pub async fn authenticate(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    ValidatedJson(request): ValidatedJson<TwoFactorCodeRequest>,
) -> Result<(HeaderMap, Json<TokenResponse>), AppError> {
    if user.two_factor_state() != TwoFactorState::Enabled {
        return Err(AppError::TwoFactorNotEnabled);
    }

    if !state
        .totp_service
        .verify(&request.two_factor_authentication_code, &user)?
    {
        tracing::warn!(user_id = %user.id, "2FA認証失敗: コード不一致");
        return Err(AppError::WrongAuthenticationCode);
    }

    let access_token = state.token_service.issue(user.id, true)?;

    tracing::info!(user_id = %user.id, "2FA認証成功");

    token_response(access_token, &user)
}
