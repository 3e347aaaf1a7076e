//! # qasign CLI
//!
//! 開発・運用向けのコマンドラインツール。
//!
//! ## サブコマンド
//! - `token` — `username` と `exp` を持つHS256 JWTを発行する
//! - `sign` — `POST /sign` を呼び出し、署名を表示する
//! - `verify` — `POST /verify` を呼び出し、結果のJSONを表示する

use clap::{Parser, Subcommand};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use qasign_types::{IdentityClaims, SignRequest, SignResponse, VerifyRequest, VerifyResponse};

/// サーバーURLの既定値
const DEFAULT_SERVER: &str = "http://localhost:8080";

#[derive(Parser)]
#[command(name = "qasign-cli", version, about = "qasign署名サーバーのクライアント")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 本人確認用のJWTを発行する
    Token {
        /// usernameクレーム
        #[arg(long)]
        username: String,
        /// サーバーの QASIGN_JWT_SECRET と同じ共有秘密
        #[arg(long)]
        secret: String,
        /// 有効期間（秒）
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },
    /// 回答セットに署名する
    Sign {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
        /// 本人確認用のJWT
        #[arg(long)]
        token: String,
        /// 質問（複数指定可、順序保持）
        #[arg(long = "question")]
        questions: Vec<String>,
        /// 回答（複数指定可、順序保持）
        #[arg(long = "answer")]
        answers: Vec<String>,
    },
    /// 署名から回答を照会する
    Verify {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        signature: String,
    },
}

/// `username` と `exp` を持つHS256 JWTを発行する。
fn mint_token(username: &str, secret: &[u8], ttl_secs: i64) -> anyhow::Result<String> {
    let claims = IdentityClaims {
        username: username.to_string(),
        exp: Some(chrono::Utc::now().timestamp() + ttl_secs),
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))?;
    Ok(token)
}

/// JSONをPOSTし、2xxならレスポンスをデシリアライズする。
/// それ以外はステータスと本文をエラーとして返す。
async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    server: &str,
    path: &str,
    body: &Req,
) -> anyhow::Result<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let url = format!("{}{}", server.trim_end_matches('/'), path);
    tracing::debug!(%url, "リクエスト送信");

    let response = client.post(&url).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        anyhow::bail!("サーバーがエラーを返しました: HTTP {} - {}", status, text.trim());
    }

    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Token {
            username,
            secret,
            ttl_secs,
        } => {
            println!("{}", mint_token(&username, secret.as_bytes(), ttl_secs)?);
        }
        Command::Sign {
            server,
            token,
            questions,
            answers,
        } => {
            let request = SignRequest {
                user_jwt: token,
                questions,
                answers,
            };
            let response: SignResponse = post_json(&client, &server, "/sign", &request).await?;
            println!("{}", response.signature);
        }
        Command::Verify {
            server,
            username,
            signature,
        } => {
            let request = VerifyRequest {
                username,
                signature,
            };
            let response: VerifyResponse =
                post_json(&client, &server, "/verify", &request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::Json;
    use clap::CommandFactory;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sign_arguments_keep_order() {
        let cli = Cli::try_parse_from([
            "qasign-cli",
            "sign",
            "--token",
            "t",
            "--question",
            "Q1",
            "--question",
            "Q2",
            "--answer",
            "A1",
        ])
        .unwrap();
        match cli.command {
            Command::Sign {
                server,
                questions,
                answers,
                ..
            } => {
                assert_eq!(server, DEFAULT_SERVER);
                assert_eq!(questions, vec!["Q1", "Q2"]);
                assert_eq!(answers, vec!["A1"]);
            }
            _ => panic!("signとして解釈されなかった"),
        }
    }

    #[test]
    fn test_mint_token_carries_username_and_exp() {
        let token = mint_token("testuser", b"secret", 60).unwrap();

        let data = decode::<IdentityClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.username, "testuser");
        assert!(data.claims.exp.unwrap() > chrono::Utc::now().timestamp());
    }

    async fn start_mock_server(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        format!("http://127.0.0.1:{port}/")
    }

    /// 2xxのレスポンスがデシリアライズされることを確認
    #[tokio::test]
    async fn test_post_json_success() {
        let app = axum::Router::new().route(
            "/sign",
            axum::routing::post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["Questions"], serde_json::json!(["Q1"]));
                Json(serde_json::json!({"signature": "c2ln"}))
            }),
        );
        let server = start_mock_server(app).await;

        let request = SignRequest {
            user_jwt: "t".to_string(),
            questions: vec!["Q1".to_string()],
            answers: vec!["A1".to_string()],
        };
        let response: SignResponse = post_json(&reqwest::Client::new(), &server, "/sign", &request)
            .await
            .unwrap();
        assert_eq!(response.signature, "c2ln");
    }

    /// 非2xxのレスポンスがステータス付きのエラーになることを確認
    #[tokio::test]
    async fn test_post_json_error_status() {
        let app = axum::Router::new().route(
            "/verify",
            axum::routing::post(|| async { (StatusCode::NOT_FOUND, "署名が見つかりません") }),
        );
        let server = start_mock_server(app).await;

        let request = VerifyRequest {
            username: "testuser".to_string(),
            signature: "mock_signature".to_string(),
        };
        let result: anyhow::Result<VerifyResponse> =
            post_json(&reqwest::Client::new(), &server, "/verify", &request).await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("404"), "{message}");
        assert!(message.contains("署名が見つかりません"), "{message}");
    }
}
