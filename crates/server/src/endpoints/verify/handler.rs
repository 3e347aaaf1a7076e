//! /verify ハンドラ実装

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use qasign_types::{VerifyRequest, VerifyResponse};

use crate::config::SignerState;
use crate::error::SignerError;

/// POST /verify — 署名から保存済みの回答とタイムスタンプを返す。
pub async fn handle_verify(
    State(state): State<Arc<SignerState>>,
    body: Bytes,
) -> Result<Json<VerifyResponse>, SignerError> {
    let request: VerifyRequest = serde_json::from_slice(&body)
        .map_err(|e| SignerError::BadRequest(format!("JSONのパースに失敗: {e}")))?;

    let stored = state
        .store
        .lookup(&request.username, &request.signature)
        .await
        .inspect_err(|e| {
            tracing::warn!(user = %request.username, error = %e, "署名の照会に失敗");
        })?;

    tracing::debug!(user = %request.username, "署名を照会しました");

    Ok(Json(VerifyResponse {
        answers: stored.answers,
        timestamp: stored.timestamp,
    }))
}
