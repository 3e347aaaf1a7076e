//! # qasign サーバー
//!
//! 質問と回答のセットをユーザーに紐づけて署名・保存し、
//! 後からその署名で回答を引き当てるHTTPサーバー。
//!
//! ## 役割
//! - 本人確認トークン（JWT）からユーザー名を取り出す
//! - (ユーザー名, 質問, 回答, 時刻) をHMAC-SHA256で署名する
//! - 署名を主キーとしてSQLiteに保存する
//!
//! ## API エンドポイント
//! - `POST /sign` — 署名の発行と保存
//! - `POST /verify` — 署名による回答の照会

mod auth;
mod config;
mod endpoints;
mod error;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, SignerState};
use crate::store::SqliteRecordStore;

/// ルーターを構築する。
pub(crate) fn build_router(state: Arc<SignerState>) -> axum::Router {
    axum::Router::new()
        .route("/sign", axum::routing::post(endpoints::handle_sign))
        .route("/verify", axum::routing::post(endpoints::handle_verify))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;

    let store = SqliteRecordStore::open(&config.database_path)?;
    tracing::info!(database = %config.database_path.display(), "SQLiteストアを開きました");

    let state = Arc::new(SignerState::new(
        &config.jwt_secret,
        config.signing_key.clone(),
        Box::new(store),
    ));
    let app = build_router(state);

    tracing::info!("サーバーを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use qasign_types::{SignResponse, VerifyResponse};

    use crate::endpoints::test_helpers::{generate_test_jwt, spawn_server, sqlite_state};

    /// HTTP経由で /sign → /verify が通ることを確認
    #[tokio::test]
    async fn test_sign_and_verify_over_http() {
        let (state, store) = sqlite_state();
        let port = spawn_server(state).await;
        let base = format!("http://127.0.0.1:{port}");
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/sign"))
            .json(&serde_json::json!({
                "UserJwt": generate_test_jwt("testuser"),
                "Questions": ["Q1: color?", "Q2: food?"],
                "Answers": ["Blue", "Pizza"],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let signed: SignResponse = resp.json().await.unwrap();

        let rows = store.raw_rows_for_user("testuser");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].signature, signed.signature);
        assert_eq!(rows[0].questions, r#"["Q1: color?","Q2: food?"]"#);
        assert_eq!(rows[0].answers, r#"["Blue","Pizza"]"#);

        let resp = client
            .post(format!("{base}/verify"))
            .json(&serde_json::json!({
                "Username": "testuser",
                "Signature": signed.signature,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let verified: VerifyResponse = resp.json().await.unwrap();
        assert_eq!(verified.answers, vec!["Blue", "Pizza"]);
    }

    /// Content-Type無しでも本文をJSONとして読むことを確認
    #[tokio::test]
    async fn test_content_type_is_not_required() {
        let (state, _store) = sqlite_state();
        let port = spawn_server(state).await;

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/verify"))
            .body(r#"{"Username":"testuser","Signature":"mock_signature"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        assert!(resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }

    /// 不正なJSONが両エンドポイントで400になることを確認
    #[tokio::test]
    async fn test_malformed_json_over_http() {
        let (state, _store) = sqlite_state();
        let port = spawn_server(state).await;
        let client = reqwest::Client::new();

        for path in ["/sign", "/verify"] {
            let resp = client
                .post(format!("http://127.0.0.1:{port}{path}"))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body("{\"broken\":")
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "{path}");
        }
    }
}
