//! # レコードストア
//!
//! 署名をキーとして (ユーザー, 質問, 回答, タイムスタンプ) を保存する
//! 永続ストアの抽象インターフェース。SQLite実装は `sqlite` サブモジュールを参照。
//!
//! 保存形式:
//! - `questions` / `answers`: JSON配列の文字列
//! - `timestamp`: RFC3339（秒精度、UTC）

pub mod sqlite;

pub use sqlite::SqliteRecordStore;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// ストアのエラー型
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// (user, signature) に一致する行が無い
    #[error("該当するレコードがありません")]
    NotFound,
    /// 主キー（signature）の重複
    #[error("署名が既に登録されています: {0}")]
    Duplicate(String),
    /// I/O・ドライバのエラー
    #[error("ストアのI/Oに失敗: {0}")]
    Backend(String),
    /// 保存済みの値をデコードできない
    #[error("保存済みデータが不正です: {0}")]
    Corrupt(String),
}

/// 挿入するレコード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    /// レコードを作成したユーザー
    pub user: String,
    /// 主キー（Base64のHMACタグ）
    pub signature: String,
    /// 質問リスト
    pub questions: Vec<String>,
    /// 回答リスト
    pub answers: Vec<String>,
    /// 保存時刻
    pub timestamp: DateTime<Utc>,
}

/// `lookup` の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAnswers {
    /// 保存されている回答
    pub answers: Vec<String>,
    /// 保存時刻
    pub timestamp: DateTime<Utc>,
}

/// レコードストアの抽象インターフェース。
///
/// 各操作は単一行に閉じる。トランザクションやロックの管理は実装側の責任。
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// レコードを追加する。署名が既に存在する場合は `Duplicate`。
    async fn insert(&self, record: &SignatureRecord) -> Result<(), StoreError>;

    /// (user, signature) が完全一致する行の回答とタイムスタンプを返す。
    async fn lookup(&self, user: &str, signature: &str) -> Result<StoredAnswers, StoreError>;

    /// 指定ユーザーの全レコードを削除し、削除件数を返す（クリーンアップ用）。
    async fn delete_by_user(&self, user: &str) -> Result<usize, StoreError>;
}

/// 文字列リストをJSON配列の文字列にする。
pub(crate) fn encode_list(items: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(items)
        .map_err(|e| StoreError::Backend(format!("リストのシリアライズに失敗: {e}")))
}

/// JSON配列の文字列を文字列リストに戻す。
pub(crate) fn decode_list(text: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(text)
        .map_err(|e| StoreError::Corrupt(format!("JSON配列のパースに失敗: {e}")))
}

/// 保存用のタイムスタンプ表現（RFC3339、秒精度）
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// 保存済みタイムスタンプを読む。
/// RFC3339に加え、SQLite標準の `YYYY-MM-DD HH:MM:SS[.fff]`（UTC）も受け付ける。
pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::Corrupt(format!("タイムスタンプのパースに失敗 ({text}): {e}")))
}
