use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// アクセストークンのクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// ユーザーID
    pub sub: Uuid,
    /// 二要素認証を通過済みか
    pub is_second_factor_authenticated: bool,
    pub iat: i64,
    pub exp: i64,
}

/// アクセストークン発行・検証サービス (HS256)
///
/// # Security
/// - 署名シークレットが空の場合は起動時にエラー
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl TokenService {
    /// # Arguments
    /// * `secret` - 署名用シークレット
    /// * `expiration_secs` - 有効期間（秒）
    pub fn new(secret: &str, expiration_secs: u64) -> Result<Self, AppError> {
        if secret.is_empty() {
            tracing::error!("JWT署名シークレットが空");
            return Err(AppError::Internal(anyhow::anyhow!("jwt secret is empty")));
        }

        let expiration_secs = i64::try_from(expiration_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                tracing::error!(expiration_secs, "JWT有効期間が不正");
                AppError::Internal(anyhow::anyhow!("invalid jwt expiration"))
            })?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs,
        })
    }

    /// アクセストークンを発行
    pub fn issue(&self, user_id: Uuid, two_factor_confirmed: bool) -> Result<String, AppError> {
        self.issue_at(
            user_id,
            two_factor_confirmed,
            OffsetDateTime::now_utc().unix_timestamp(),
        )
    }

    fn issue_at(
        &self,
        user_id: Uuid,
        two_factor_confirmed: bool,
        issued_at: i64,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            is_second_factor_authenticated: two_factor_confirmed,
            iat: issued_at,
            exp: issued_at + self.expiration_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "JWT署名エラー");
            AppError::Internal(anyhow::anyhow!("jwt signing error"))
        })
    }

    /// アクセストークンを検証し、クレームを返す
    ///
    /// 署名不一致・期限切れ・形式不正はすべて `AppError::Authentication`
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_validate() {
        let service = TokenService::new("test-secret", 3600).unwrap();
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id, true).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.is_second_factor_authenticated);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_pending_flag_is_preserved() {
        let service = TokenService::new("test-secret", 60).unwrap();
        let token = service.issue(Uuid::new_v4(), false).unwrap();
        assert!(!service.validate(&token).unwrap().is_second_factor_authenticated);
    }

    #[test]
    fn test_reject_other_secret() {
        let issuer = TokenService::new("secret-a", 60).unwrap();
        let verifier = TokenService::new("secret-b", 60).unwrap();

        let token = issuer.issue(Uuid::new_v4(), false).unwrap();
        assert!(matches!(
            verifier.validate(&token),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_reject_expired() {
        let service = TokenService::new("test-secret", 60).unwrap();
        let issued_at = OffsetDateTime::now_utc().unix_timestamp() - 3600;

        let token = service.issue_at(Uuid::new_v4(), false, issued_at).unwrap();
        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_reject_garbage() {
        let service = TokenService::new("test-secret", 60).unwrap();
        assert!(service.validate("not-a-jwt").is_err());
    }

    #[test]
    fn test_misconfiguration() {
        assert!(TokenService::new("", 60).is_err());
        assert!(TokenService::new("secret", 0).is_err());
    }
}
