//! # 本人確認トークンの検証
//!
//! 共有秘密で署名されたJWTを検証し、`username` クレームを取り出す。
//! 署名鍵（HMAC）とは独立した秘密を使う。

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

/// 本人確認のエラー型
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// トークンのパース・署名検証・登録済みクレーム（exp/nbf）の検証に失敗
    #[error("{0}")]
    InvalidToken(String),
    /// クレームが想定外
    #[error("{0}")]
    UnauthorizedClaims(String),
}

/// JWT検証器。
///
/// HS256/HS384/HS512を受け付ける。`exp` と `nbf` は存在する場合のみ検証し、
/// `username` 以外のクレームは要求しない。
pub struct IdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    /// 共有秘密から検証器を構築する。
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// トークンを検証し、`username` クレームを返す。
    pub fn extract_username(&self, token: &str) -> Result<String, IdentityError> {
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;

        match data.claims.get("username") {
            Some(Value::String(username)) => Ok(username.clone()),
            Some(_) => Err(IdentityError::UnauthorizedClaims(
                "usernameクレームが文字列ではありません".into(),
            )),
            None => Err(IdentityError::UnauthorizedClaims(
                "usernameクレームが見つかりません".into(),
            )),
        }
    }
}
