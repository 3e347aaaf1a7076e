//! # エンドポイント
//!
//! - `POST /sign` — 回答セットに署名し、保存する
//! - `POST /verify` — 署名から保存済みの回答を引き当てる

pub mod sign;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use sign::handle_sign;
pub use verify::handle_verify;
