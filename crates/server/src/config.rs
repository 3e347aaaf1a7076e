//! # サーバー設定・共有状態
//!
//! 環境変数からの設定読み込みと、ハンドラに注入する共有状態の定義。

use std::path::PathBuf;

use anyhow::Context;
use qasign_crypto::HmacKey;

use crate::auth::IdentityVerifier;
use crate::store::RecordStore;

/// 待ち受けアドレスの既定値
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// SQLiteファイルの既定値
pub const DEFAULT_DATABASE_PATH: &str = "test-signer.db";

/// 起動時に一度だけ読み込む設定。
pub struct ServerConfig {
    /// 待ち受けアドレス（`QASIGN_BIND_ADDR`）
    pub bind_addr: String,
    /// SQLiteファイルのパス（`QASIGN_DATABASE_PATH`）
    pub database_path: PathBuf,
    /// 本人確認トークン検証用の共有秘密（`QASIGN_JWT_SECRET`）
    pub jwt_secret: Vec<u8>,
    /// レコード署名用のHMAC鍵（`QASIGN_SIGNING_KEY`、16進数）
    pub signing_key: HmacKey,
}

impl ServerConfig {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から読み込む。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = lookup("QASIGN_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let database_path = lookup("QASIGN_DATABASE_PATH")
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
            .into();

        let jwt_secret = lookup("QASIGN_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("QASIGN_JWT_SECRETが未設定です")?
            .into_bytes();

        let signing_key = match lookup("QASIGN_SIGNING_KEY") {
            Some(key_hex) => HmacKey::from_hex(&key_hex).context("QASIGN_SIGNING_KEYが不正です")?,
            None => {
                // 開発環境用: 再起動すると以前の署名は再計算できなくなる
                tracing::warn!("QASIGN_SIGNING_KEYが未設定です。ランダムキーを生成します（開発環境用）");
                HmacKey::generate()
            }
        };

        Ok(Self {
            bind_addr,
            database_path,
            jwt_secret,
            signing_key,
        })
    }
}

/// ハンドラ間で共有する状態。起動後は読み取り専用。
pub struct SignerState {
    /// 本人確認トークンの検証器
    pub identity: IdentityVerifier,
    /// レコード署名用のHMAC鍵
    pub signing_key: HmacKey,
    /// レコードストア（SQLite等、トレイトで抽象化）
    pub store: Box<dyn RecordStore>,
}

impl SignerState {
    /// 鍵とストアから状態を構築する。
    pub fn new(jwt_secret: &[u8], signing_key: HmacKey, store: Box<dyn RecordStore>) -> Self {
        Self {
            identity: IdentityVerifier::new(jwt_secret),
            signing_key,
            store,
        }
    }
}
