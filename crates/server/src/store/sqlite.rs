//! # SQLiteレコードストア
//!
//! 単一のSQLite接続を `Arc<Mutex<_>>` で共有し、各操作をブロッキングプールで実行する。

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{
    decode_list, encode_list, format_timestamp, parse_timestamp, RecordStore, SignatureRecord,
    StoreError, StoredAnswers,
};

/// 起動時に作成するテーブル
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS signatures (
    signature TEXT PRIMARY KEY,
    user TEXT,
    questions TEXT,
    answers TEXT,
    timestamp TIMESTAMP
);
";

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn insert_error(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Duplicate(e.to_string())
        }
        _ => backend(e),
    }
}

/// SQLiteによるレコードストア実装。
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// ファイルを開き（無ければ作成し）、スキーマを用意する。
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn)
    }

    /// インメモリDBで構築する。
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 接続をロックしてクロージャをブロッキングプール上で実行する。
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("SQLite接続のロックが破損しています".into()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("ブロッキングタスクの実行に失敗: {e}")))?
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: &SignatureRecord) -> Result<(), StoreError> {
        let user = record.user.clone();
        let signature = record.signature.clone();
        let questions = encode_list(&record.questions)?;
        let answers = encode_list(&record.answers)?;
        let timestamp = format_timestamp(record.timestamp);

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO signatures (user, signature, questions, answers, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user, signature, questions, answers, timestamp],
            )
            .map_err(insert_error)?;
            Ok(())
        })
        .await
    }

    async fn lookup(&self, user: &str, signature: &str) -> Result<StoredAnswers, StoreError> {
        let user = user.to_string();
        let signature = signature.to_string();

        let (answers, timestamp) = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT answers, timestamp FROM signatures WHERE user = ?1 AND signature = ?2",
                    params![user, signature],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()
                .map_err(backend)?
                .ok_or(StoreError::NotFound)
            })
            .await?;

        Ok(StoredAnswers {
            answers: decode_list(&answers)?,
            timestamp: parse_timestamp(&timestamp)?,
        })
    }

    async fn delete_by_user(&self, user: &str) -> Result<usize, StoreError> {
        let user = user.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM signatures WHERE user = ?1", params![user])
                .map_err(backend)
        })
        .await
    }
}

/// テスト用: 保存された行をそのままの文字列で読む。
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub signature: String,
    pub user: String,
    pub questions: String,
    pub answers: String,
    pub timestamp: String,
}

#[cfg(test)]
impl SqliteRecordStore {
    /// 指定ユーザーの行を保存形式のまま返す。
    pub fn raw_rows_for_user(&self, user: &str) -> Vec<RawRow> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT signature, user, questions, answers, timestamp
                 FROM signatures WHERE user = ?1",
            )
            .unwrap();
        let rows = stmt
            .query_map(params![user], |row| {
                Ok(RawRow {
                    signature: row.get(0)?,
                    user: row.get(1)?,
                    questions: row.get(2)?,
                    answers: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    }

    /// 保存形式の文字列を直接書き込む。
    pub fn insert_raw(&self, row: &RawRow) {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO signatures (user, signature, questions, answers, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![row.user, row.signature, row.questions, row.answers, row.timestamp],
        )
        .unwrap();
    }
}
