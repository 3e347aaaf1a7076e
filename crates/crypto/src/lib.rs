//! # qasign 暗号処理
//!
//! レコード署名に使うHMAC-SHA256と、その結果のBase64表現を提供する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 署名（MAC） | HMAC-SHA256 |
//! | タグ表現 | Base64（Standard） |
//!
//! 署名対象の正規化は呼び出し側の型定義（フィールド順）に従う。
//! このクレートはシリアライズ済みバイト列に対してのみ責任を持つ。

use std::fmt;

use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 生成する鍵の長さ（バイト）
pub const GENERATED_KEY_LEN: usize = 32;

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 鍵が空
    #[error("HMAC鍵が空です")]
    EmptyKey,
    /// 16進数表現の鍵のデコード失敗
    #[error("HMAC鍵の16進数デコードに失敗しました: {0}")]
    InvalidKeyHex(String),
    /// HMACの初期化失敗
    #[error("HMACの初期化に失敗しました: {0}")]
    HmacFailed(String),
    /// 署名対象のシリアライズ失敗
    #[error("署名対象のシリアライズに失敗しました: {0}")]
    Serialize(String),
    /// タグのBase64デコード失敗
    #[error("タグのBase64デコードに失敗しました: {0}")]
    InvalidTag(String),
    /// タグの不一致
    #[error("タグの検証に失敗しました")]
    TagMismatch,
}

/// Base64エンジン（Standard）
pub fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// HMAC-SHA256の鍵。
///
/// `Debug` 出力には鍵の内容を含めない。
#[derive(Clone, PartialEq, Eq)]
pub struct HmacKey(Vec<u8>);

impl HmacKey {
    /// バイト列から鍵を構築する。空の鍵は拒否する。
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        Ok(Self(bytes))
    }

    /// 16進数文字列から鍵を構築する。
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(hex_str.trim()).map_err(|e| CryptoError::InvalidKeyHex(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// OSの乱数源からランダムな鍵を生成する（開発環境用）。
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// 鍵のバイト列
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

fn new_mac(key: &HmacKey) -> Result<HmacSha256, CryptoError> {
    HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::HmacFailed(e.to_string()))
}

/// HMAC-SHA256タグを計算する。
pub fn hmac_sha256(key: &HmacKey, message: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut mac = new_mac(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

/// メッセージに対するHMAC-SHA256タグをBase64文字列で返す。
pub fn sign_bytes(key: &HmacKey, message: &[u8]) -> Result<String, CryptoError> {
    let tag = hmac_sha256(key, message)?;
    Ok(b64().encode(tag))
}

/// 値をJSONにシリアライズし、そのUTF-8バイト列に署名する。
///
/// キー順は `T` のフィールド宣言順に従う。同じ値・同じ鍵なら常に同じタグになる。
pub fn sign_json<T: Serialize + ?Sized>(key: &HmacKey, value: &T) -> Result<String, CryptoError> {
    let bytes = serde_json::to_vec(value).map_err(|e| CryptoError::Serialize(e.to_string()))?;
    sign_bytes(key, &bytes)
}

/// Base64タグがメッセージに対して正しいかを定数時間で検証する。
pub fn verify_tag(key: &HmacKey, message: &[u8], tag_b64: &str) -> Result<(), CryptoError> {
    let tag = b64()
        .decode(tag_b64)
        .map_err(|e| CryptoError::InvalidTag(e.to_string()))?;
    let mut mac = new_mac(key)?;
    mac.update(message);
    mac.verify_slice(&tag).map_err(|_| CryptoError::TagMismatch)
}
