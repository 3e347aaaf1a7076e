//! # /sign エンドポイント
//!
//! ## 処理フロー
//! 1. リクエストボディ `{UserJwt, Questions, Answers}` をパース
//! 2. JWTを検証し、usernameクレームを取り出す
//! 3. (username, questions, answers, 現在時刻) を正規化してHMAC-SHA256で署名
//! 4. 署名を主キーとしてレコードを保存
//! 5. `{"signature": ...}` を返却
//!
//! 保存するタイムスタンプは署名に使った時刻とは別に取得する。

mod handler;


pub use handler::handle_sign;
