use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng},
};
use data_encoding::BASE32;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use totp_rs::{Algorithm, TOTP};

use crate::error::AppError;
use crate::models::{TwoFactorState, User};
use crate::repositories::UserStore;

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECS: u64 = 30;
const NONCE_LEN: usize = 12;

/// 2FA登録結果
pub struct Enrollment {
    /// Base32シークレット（ログ出力禁止）
    pub secret: SecretString,
    /// otpauth:// 形式の登録URI
    pub otpauth_url: String,
}

/// TOTP (Time-based One-Time Password) サービス
///
/// # Security
/// - シークレットはAES-256-GCMで暗号化してDB保存
/// - シークレット平文・入力コードはログに出力しない
#[derive(Clone)]
pub struct TotpService {
    issuer: String,
    encryption_key: [u8; 32],
    users: Arc<dyn UserStore>,
}

impl TotpService {
    /// 新しい TotpService を作成
    ///
    /// # Arguments
    /// * `issuer` - TOTP発行者名（アプリ名）
    /// * `encryption_key_base64` - Base64エンコードされた32バイトの暗号化キー
    /// * `users` - シークレット保存先
    pub fn new(
        issuer: String,
        encryption_key_base64: &str,
        users: Arc<dyn UserStore>,
    ) -> Result<Self, AppError> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        // otpauth ラベル "<issuer>:<account>" の区切り文字
        if issuer.is_empty() || issuer.contains(':') {
            tracing::error!(issuer = %issuer, "TOTP発行者名が不正");
            return Err(AppError::Internal(anyhow::anyhow!(
                "totp issuer must be non-empty and must not contain ':'"
            )));
        }

        let key_bytes = STANDARD.decode(encryption_key_base64).map_err(|e| {
            tracing::error!(error = ?e, "TOTP暗号化キーのBase64デコードエラー");
            AppError::Internal(anyhow::anyhow!("invalid encryption key format"))
        })?;

        let encryption_key: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            tracing::error!(
                expected = 32,
                actual = key_bytes.len(),
                "TOTP暗号化キーの長さが不正"
            );
            AppError::Internal(anyhow::anyhow!("encryption key must be 32 bytes"))
        })?;

        Ok(Self {
            issuer,
            encryption_key,
            users,
        })
    }

    /// 20バイトのランダムシークレットを生成し、Base32でエンコード
    pub fn generate_secret() -> SecretString {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        SecretString::from(BASE32.encode(&bytes))
    }

    /// 2FA登録を開始
    ///
    /// 新しいシークレットを生成して暗号化保存し、登録URIを返す。
    /// 未確認のシークレットは上書きされる。有効化フラグは変更しない。
    pub async fn enroll(&self, user: &User) -> Result<Enrollment, AppError> {
        if user.two_factor_state() == TwoFactorState::Enabled {
            return Err(AppError::TwoFactorAlreadyEnabled);
        }

        let secret = Self::generate_secret();
        let otpauth_url = self
            .create_totp(&user.email, secret.expose_secret())?
            .get_url();

        let encrypted = self.encrypt_secret(secret.expose_secret())?;
        self.users.set_two_factor_secret(&encrypted, user.id).await?;

        tracing::info!(user_id = %user.id, "2FA登録開始");

        Ok(Enrollment {
            secret,
            otpauth_url,
        })
    }

    /// 登録URIをQRコード（PNG）に変換
    pub fn render_qr_code(&self, otpauth_url: &str) -> Result<Vec<u8>, AppError> {
        let totp = TOTP::from_url(otpauth_url).map_err(|e| {
            tracing::error!(error = %e, "登録URIのパースエラー");
            AppError::Internal(anyhow::anyhow!("invalid otpauth url"))
        })?;

        totp.get_qr_png().map_err(|e| {
            tracing::error!(error = %e, "QRコード生成エラー");
            AppError::Internal(anyhow::anyhow!("qr code generation error"))
        })
    }

    /// 現在時刻でTOTPコードを検証
    ///
    /// シークレット未登録のユーザーは常に `false`
    pub fn verify(&self, code: &str, user: &User) -> Result<bool, AppError> {
        let current_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| {
                tracing::error!(error = ?e, "システム時刻取得エラー");
                AppError::Internal(anyhow::anyhow!("system time error"))
            })?
            .as_secs();

        self.verify_at(code, user, current_time)
    }

    /// 指定時刻でTOTPコードを検証
    ///
    /// # Note
    /// 前後1ステップの時間ウィンドウを許容（±30秒）
    pub fn verify_at(&self, code: &str, user: &User, unix_time: u64) -> Result<bool, AppError> {
        let Some(encrypted) = &user.two_factor_secret else {
            tracing::debug!(user_id = %user.id, "2FAシークレット未登録");
            return Ok(false);
        };

        // 入力検証: コードは6桁の数字のみ
        if code.len() != DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            tracing::debug!(user_id = %user.id, "2FAコード形式不正");
            return Ok(false);
        }

        let secret = self.decrypt_secret(encrypted)?;
        let valid = self
            .create_totp_for_verify(secret.expose_secret())?
            .check(code, unix_time);

        tracing::debug!(user_id = %user.id, valid, "2FAコード検証");

        Ok(valid)
    }

    /// シークレットをAES-256-GCMで暗号化
    ///
    /// # Returns
    /// 96ビットnonce (12バイト) + 暗号文
    pub fn encrypt_secret(&self, secret: &str) -> Result<Vec<u8>, AppError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, secret.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "シークレット暗号化エラー");
            AppError::Internal(anyhow::anyhow!("encryption error"))
        })?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// 暗号化されたシークレットを復号
    pub fn decrypt_secret(&self, encrypted: &[u8]) -> Result<SecretString, AppError> {
        if encrypted.len() < NONCE_LEN {
            tracing::error!(len = encrypted.len(), "暗号化データが短すぎる");
            return Err(AppError::Internal(anyhow::anyhow!(
                "encrypted data too short"
            )));
        }

        let cipher = self.cipher()?;
        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|e| {
            tracing::error!(error = ?e, "シークレット復号エラー");
            AppError::Internal(anyhow::anyhow!("decryption error"))
        })?;

        String::from_utf8(plaintext)
            .map(SecretString::from)
            .map_err(|e| {
                tracing::error!(error = ?e, "復号データのUTF-8変換エラー");
                AppError::Internal(anyhow::anyhow!("invalid utf8 after decryption"))
            })
    }

    fn cipher(&self) -> Result<Aes256Gcm, AppError> {
        Aes256Gcm::new_from_slice(&self.encryption_key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })
    }

    /// TOTP オブジェクトを作成（登録URI生成用）
    fn create_totp(&self, email: &str, secret: &str) -> Result<TOTP, AppError> {
        build_totp(secret, Some(self.issuer.clone()), email.to_string())
    }

    /// TOTP オブジェクトを作成（検証用）
    fn create_totp_for_verify(&self, secret: &str) -> Result<TOTP, AppError> {
        build_totp(secret, None, String::new())
    }
}

fn build_totp(secret: &str, issuer: Option<String>, account: String) -> Result<TOTP, AppError> {
    let secret_bytes = BASE32.decode(secret.as_bytes()).map_err(|e| {
        tracing::error!(error = ?e, "シークレットのBase32デコードエラー");
        AppError::Internal(anyhow::anyhow!("invalid base32 secret"))
    })?;

    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECS,
        secret_bytes,
        issuer,
        account,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "TOTP作成エラー");
        AppError::Internal(anyhow::anyhow!("totp creation error"))
    })
}
