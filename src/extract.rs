//! リクエストから認証済みコンテキストと検証済みボディを取り出す extractor

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
};
use garde::Validate;
use http::{header::AUTHORIZATION, request::Parts};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::User;
use crate::services::token::Claims;
use crate::state::AppState;

/// Bearer トークンで認証されたユーザー
///
/// 二要素認証の通過状態は問わない（2FA登録・確認用のエンドポイント向け）
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.token_service.validate(token)?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Authentication("user not found".to_string()))?;

        Ok(Self { user, claims })
    }
}

/// 二要素認証を考慮した認証済みユーザー
///
/// 2FA有効ユーザーは `/2fa/authenticate` で発行されたトークンが必要
#[derive(Debug, Clone)]
pub struct TwoFactorUser(pub User);

impl FromRequestParts<AppState> for TwoFactorUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { user, claims } = AuthUser::from_request_parts(parts, state).await?;

        if user.is_two_factor_enabled && !claims.is_second_factor_authenticated {
            tracing::warn!(user_id = %user.id, "二要素認証未完了のトークン");
            return Err(AppError::Authentication(
                "second factor required".to_string(),
            ));
        }

        Ok(Self(user))
    }
}

/// JSON ボディをデシリアライズし garde で検証する
///
/// 形式不正・検証エラーはいずれも `AppError::Validation` (400)
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
    T::Context: Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|report| AppError::Validation(report.to_string()))?;

        Ok(Self(value))
    }
}

/// パスパラメータを取り出す
///
/// パース失敗は `AppError::Validation` (400, JSON ボディ)
#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        Ok(Self(value))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Authentication("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Authentication("invalid authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("invalid authorization scheme".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request as HttpRequest;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_token_missing() {
        assert!(bearer_token(&parts_with(None)).is_err());
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        assert!(bearer_token(&parts_with(Some("Basic dXNlcjpwYXNz"))).is_err());
        assert!(bearer_token(&parts_with(Some("Bearer "))).is_err());
    }
}
