//! # エンドポイントテスト用共通ヘルパー
//!
//! sign, verifyテストで共有する状態構築・トークン発行・モックストア。

use std::sync::{Arc, Mutex};

use jsonwebtoken::{encode, EncodingKey, Header};
use qasign_crypto::HmacKey;
use qasign_types::IdentityClaims;

use crate::config::SignerState;
use crate::store::{RecordStore, SignatureRecord, SqliteRecordStore, StoreError, StoredAnswers};

/// テスト用の本人確認トークン秘密
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret";

/// テスト用のHMAC鍵
pub fn test_signing_key() -> HmacKey {
    HmacKey::from_bytes(b"test-signing-key".to_vec()).unwrap()
}

/// 任意のクレームを任意の秘密でHS256署名したJWTを作る。
pub fn encode_claims(claims: &serde_json::Value, secret: &[u8]) -> String {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret)).unwrap()
}

/// 1時間有効な `username` 入りのJWTを作る。
pub fn generate_test_jwt(username: &str) -> String {
    let claims = IdentityClaims {
        username: username.to_string(),
        exp: Some(chrono::Utc::now().timestamp() + 3600),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .unwrap()
}

/// インメモリSQLiteを使う状態を構築し、検査用にストアのハンドルも返す。
pub fn sqlite_state() -> (Arc<SignerState>, SqliteRecordStore) {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let state = Arc::new(SignerState::new(
        TEST_JWT_SECRET,
        test_signing_key(),
        Box::new(store.clone()),
    ));
    (state, store)
}

/// 常にI/Oエラーを返すモックストア。
pub struct FailingStore;

#[async_trait::async_trait]
impl RecordStore for FailingStore {
    async fn insert(&self, _record: &SignatureRecord) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk I/O error".into()))
    }

    async fn lookup(&self, _user: &str, _signature: &str) -> Result<StoredAnswers, StoreError> {
        Err(StoreError::Backend("disk I/O error".into()))
    }

    async fn delete_by_user(&self, _user: &str) -> Result<usize, StoreError> {
        Err(StoreError::Backend("disk I/O error".into()))
    }
}

/// 常に失敗するストアを使う状態を構築する。
pub fn failing_state() -> Arc<SignerState> {
    Arc::new(SignerState::new(
        TEST_JWT_SECRET,
        test_signing_key(),
        Box::new(FailingStore),
    ))
}

/// ルーターを `127.0.0.1` のエフェメラルポートで起動し、ポート番号を返す。
pub async fn spawn_server(state: Arc<SignerState>) -> u16 {
    let app = crate::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    port
}

/// ログ出力を溜めるバッファ。
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// 現在のスレッドのログを捕捉する。ガードを保持している間有効。
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), buffer)
}
