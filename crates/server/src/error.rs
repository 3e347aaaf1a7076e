//! # サーバーエラー型
//!
//! 全エンドポイントで共通のエラー型。ハンドラ境界でHTTPステータスと
//! プレーンテキストの本文に変換する。

use axum::http::StatusCode;

use crate::auth::IdentityError;
use crate::store::StoreError;

/// サーバーエラー型。
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// 不正なリクエスト（JSONパース失敗）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 本人確認トークンのパース・署名検証に失敗（500として返す）
    #[error("JWTのパースに失敗: {0}")]
    InvalidToken(String),
    /// JWTのクレームが想定外（usernameが無い、文字列でない）
    #[error("JWTのクレームが不正です: {0}")]
    UnauthorizedClaims(String),
    /// 該当レコードなし
    #[error("署名が見つかりません")]
    NotFound,
    /// ストア操作に失敗
    #[error("ストア操作に失敗: {0}")]
    Store(String),
    /// 内部エラー（署名対象のシリアライズ失敗等）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl SignerError {
    /// このエラーに対応するHTTPステータス
    pub fn status(&self) -> StatusCode {
        match self {
            SignerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SignerError::UnauthorizedClaims(_) => StatusCode::UNAUTHORIZED,
            SignerError::NotFound => StatusCode::NOT_FOUND,
            SignerError::InvalidToken(_) | SignerError::Store(_) | SignerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<IdentityError> for SignerError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidToken(msg) => SignerError::InvalidToken(msg),
            IdentityError::UnauthorizedClaims(msg) => SignerError::UnauthorizedClaims(msg),
        }
    }
}

impl From<StoreError> for SignerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => SignerError::NotFound,
            other => SignerError::Store(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for SignerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "リクエスト処理に失敗");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "リクエストを拒否");
        }
        (status, self.to_string()).into_response()
    }
}
