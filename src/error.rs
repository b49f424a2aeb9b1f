use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証エラー: {0}")]
    Authentication(String),

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("認証コードが無効です")]
    WrongAuthenticationCode,

    #[error("二要素認証は既に有効です")]
    TwoFactorAlreadyEnabled,

    #[error("二要素認証が有効化されていません")]
    TwoFactorNotEnabled,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Authentication(reason) => {
                tracing::debug!(reason = %reason, "認証失敗");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "User with that email already exists".to_string(),
            ),
            Self::WrongAuthenticationCode => (
                StatusCode::UNAUTHORIZED,
                "Wrong authentication code".to_string(),
            ),
            Self::TwoFactorAlreadyEnabled => (
                StatusCode::CONFLICT,
                "Two-factor authentication is already enabled".to_string(),
            ),
            Self::TwoFactorNotEnabled => (
                StatusCode::BAD_REQUEST,
                "Two-factor authentication is not enabled".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                AppError::Authentication("x".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (AppError::WrongAuthenticationCode, StatusCode::UNAUTHORIZED),
            (
                AppError::Validation("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::EmailAlreadyExists, StatusCode::CONFLICT),
            (AppError::NotFound("Quote".to_string()), StatusCode::NOT_FOUND),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_wrong_code_message() {
        let response = AppError::WrongAuthenticationCode.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Wrong authentication code");
    }
}
