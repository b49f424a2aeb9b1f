use axum::{Json, extract::State, http::StatusCode};
use garde::Validate;
use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{TwoFactorUser, ValidatedJson};
use crate::models::User;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// TOTP のアカウント名にもなるため ':' を含むアドレスは受け付けない
    #[garde(email, custom(no_colon))]
    pub email: String,
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(length(min = 8))]
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogInRequest {
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

fn no_colon(value: &str, _ctx: &()) -> garde::Result {
    if value.contains(':') {
        return Err(garde::Error::new("must not contain ':'"));
    }
    Ok(())
}

/// レスポンスに含めるユーザー情報
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserData {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// トークン発行レスポンス（ログイン・2FA認証共通）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub data: UserData,
}

/// ユーザー登録ハンドラー
///
/// POST /authentication/register
///
/// # Security
/// - パスワードはログに出力しない
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserData>), AppError> {
    let user = state
        .auth_service
        .register(&request.email, &request.name, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserData::from(&user))))
}

/// ログインハンドラー
///
/// POST /authentication/log-in
///
/// 発行するトークンは常に二要素認証未完了（2FA有効ユーザーは /2fa/authenticate へ）
pub async fn log_in(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LogInRequest>,
) -> Result<(HeaderMap, Json<TokenResponse>), AppError> {
    let user = state
        .auth_service
        .authenticate(&request.email, &request.password)
        .await?;

    let access_token = state.token_service.issue(user.id, false)?;

    tracing::info!(
        user_id = %user.id,
        two_factor_required = user.is_two_factor_enabled,
        "ログイン成功"
    );

    token_response(access_token, &user)
}

/// 現在のユーザー情報
///
/// GET /authentication
pub async fn current_user(TwoFactorUser(user): TwoFactorUser) -> Json<UserData> {
    Json(UserData::from(&user))
}

/// `Authorization` ヘッダーとボディの両方にトークンを載せたレスポンスを作る
pub(crate) fn token_response(
    access_token: String,
    user: &User,
) -> Result<(HeaderMap, Json<TokenResponse>), AppError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|e| {
        tracing::error!(error = ?e, "Authorizationヘッダー生成エラー");
        AppError::Internal(anyhow::anyhow!("invalid authorization header value"))
    })?;
    headers.insert(AUTHORIZATION, value);

    Ok((
        headers,
        Json(TokenResponse {
            access_token,
            data: UserData::from(user),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_register_invalid_email() {
        let request = RegisterRequest {
            email: "invalid-email".to_string(),
            name: "Alice".to_string(),
            password: "password123".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_register_colon_email() {
        let request = RegisterRequest {
            email: "a:b@x.com".to_string(),
            name: "Alice".to_string(),
            password: "password123".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_register_short_password() {
        let request = RegisterRequest {
            email: "a@x.com".to_string(),
            name: "Alice".to_string(),
            password: "short".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_register_valid() {
        let request = RegisterRequest {
            email: "a@x.com".to_string(),
            name: "Alice".to_string(),
            password: "password123".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_log_in_empty_password() {
        let request = LogInRequest {
            email: "a@x.com".to_string(),
            password: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_token_response_shape() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "Alice".to_string(),
            password_hash: String::new(),
            two_factor_secret: None,
            is_two_factor_enabled: false,
            created_at: time::OffsetDateTime::now_utc(),
            updated_at: time::OffsetDateTime::now_utc(),
        };

        let (headers, Json(body)) = token_response("abc".to_string(), &user).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["accessToken"], "abc");
        assert_eq!(json["data"]["email"], "a@x.com");
        assert_eq!(json["data"]["name"], "Alice");
    }
}
