//! # /verify エンドポイント
//!
//! (Username, Signature) でレコードを引き当て、保存済みの回答と
//! タイムスタンプを返す。HMACの再計算は行わない。
//! 署名はそれ自体が照会用の資格情報として扱われる。

mod handler;


pub use handler::handle_verify;
