//! # qasign 共有型定義
//!
//! サーバーとCLIで共有するリクエスト/レスポンス、署名対象レコード、
//! 本人確認トークンのクレームをRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - リクエスト/レスポンスのフィールド名はPascalCase（`/sign` の `signature` のみ小文字）
//! - リクエストのフィールド名は大文字小文字を区別せずに照合する
//! - タイムスタンプ: RFC3339
//! - 署名: Base64（Standard、パディングあり）

use chrono::{DateTime, Utc};
use serde::de::MapAccess;
use serde::{Deserialize, Deserializer, Serialize};

mod fold;

use fold::FoldedFields;

// ---------------------------------------------------------------------------
// 署名対象レコード
// ---------------------------------------------------------------------------

/// HMACの署名対象となる正規化レコード。
///
/// フィールドの宣言順がそのままJSONのキー順になり、署名バイト列を決定する。
/// 順序やタイムスタンプの精度を変えると署名値が変わる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignData {
    /// 本人確認トークンから取り出したユーザー名
    pub username: String,
    /// 質問（順序保持）
    pub questions: Vec<String>,
    /// 回答（questionsと位置で対応するが、長さの一致は強制しない）
    pub answers: Vec<String>,
    /// 署名時刻（ナノ秒精度のRFC3339）
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// POST /sign
// ---------------------------------------------------------------------------

/// `POST /sign` のリクエストボディ。
///
/// フィールドが欠けている場合、または `null` の場合は空値として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignRequest {
    /// 本人確認用のJWT
    pub user_jwt: String,
    /// 質問リスト
    pub questions: Vec<String>,
    /// 回答リスト
    pub answers: Vec<String>,
}

impl FoldedFields for SignRequest {
    const NAME: &'static str = "SignRequest";
    const FIELDS: &'static [&'static str] = &["UserJwt", "Questions", "Answers"];

    fn read_field<'de, A: MapAccess<'de>>(
        &mut self,
        index: usize,
        map: &mut A,
    ) -> Result<(), A::Error> {
        match index {
            0 => fold::read_string(map, &mut self.user_jwt),
            1 => fold::read_list(map, &mut self.questions),
            _ => fold::read_list(map, &mut self.answers),
        }
    }
}

impl<'de> Deserialize<'de> for SignRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        fold::deserialize_folded(deserializer)
    }
}

/// `POST /sign` のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignResponse {
    /// Base64エンコードされたHMAC-SHA256タグ。レコードの主キーを兼ねる。
    pub signature: String,
}

// ---------------------------------------------------------------------------
// POST /verify
// ---------------------------------------------------------------------------

/// `POST /verify` のリクエストボディ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifyRequest {
    /// レコード作成時のユーザー名
    pub username: String,
    /// `/sign` が返した署名
    pub signature: String,
}

impl FoldedFields for VerifyRequest {
    const NAME: &'static str = "VerifyRequest";
    const FIELDS: &'static [&'static str] = &["Username", "Signature"];

    fn read_field<'de, A: MapAccess<'de>>(
        &mut self,
        index: usize,
        map: &mut A,
    ) -> Result<(), A::Error> {
        match index {
            0 => fold::read_string(map, &mut self.username),
            _ => fold::read_string(map, &mut self.signature),
        }
    }
}

impl<'de> Deserialize<'de> for VerifyRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        fold::deserialize_folded(deserializer)
    }
}

/// `POST /verify` のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifyResponse {
    /// 保存されている回答（順序保持）
    pub answers: Vec<String>,
    /// 保存時に記録したタイムスタンプ
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// 本人確認トークン
// ---------------------------------------------------------------------------

/// 本人確認トークン（JWT）のクレーム。
///
/// サーバー側は `username` 以外のクレームを要求しない。
/// `exp` が含まれる場合のみ有効期限を検証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// ユーザー名
    pub username: String,
    /// 有効期限（UNIX秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}
