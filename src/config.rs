use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// 未設定の場合はインメモリストアで起動する
    #[serde(default)]
    pub database_url: Option<SecretBox<String>>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // JWT設定
    /// アクセストークン署名用シークレット
    pub jwt_secret: SecretBox<String>,
    /// アクセストークンの有効期間（秒）
    #[serde(default = "default_jwt_expiration_time")]
    pub jwt_expiration_time: u64,

    // 2FA (TOTP) 設定
    /// TOTP発行者名（認証アプリに表示される）
    pub two_factor_authentication_app_name: String,
    /// AES-256暗号化キー（Base64エンコード、32バイト）
    pub two_factor_encryption_key: SecretBox<String>,

    // CORS設定
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_JWT_EXPIRATION_TIME: u64 = 3600;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_jwt_expiration_time() -> u64 {
    DEFAULT_JWT_EXPIRATION_TIME
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
