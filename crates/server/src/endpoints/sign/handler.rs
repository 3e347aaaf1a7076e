//! /sign ハンドラ実装

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::Utc;

use qasign_types::{SignData, SignRequest, SignResponse};

use crate::config::SignerState;
use crate::error::SignerError;
use crate::store::SignatureRecord;

/// POST /sign — 回答セットに署名し、保存する。
///
/// Content-Typeは問わず、本文をJSONとして読む。
pub async fn handle_sign(
    State(state): State<Arc<SignerState>>,
    body: Bytes,
) -> Result<Json<SignResponse>, SignerError> {
    let request: SignRequest = serde_json::from_slice(&body)
        .map_err(|e| SignerError::BadRequest(format!("JSONのパースに失敗: {e}")))?;

    // Step 1: 本人確認
    let username = state.identity.extract_username(&request.user_jwt)?;

    // Step 2: 署名
    let sign_data = SignData {
        username,
        questions: request.questions,
        answers: request.answers,
        timestamp: Utc::now(),
    };
    let signature = qasign_crypto::sign_json(&state.signing_key, &sign_data)
        .map_err(|e| SignerError::Internal(format!("署名に失敗: {e}")))?;

    // Step 3: 保存（タイムスタンプは改めて取得する）
    let SignData {
        username,
        questions,
        answers,
        ..
    } = sign_data;
    let record = SignatureRecord {
        user: username,
        signature,
        questions,
        answers,
        timestamp: Utc::now(),
    };
    state.store.insert(&record).await.inspect_err(|e| {
        tracing::error!(user = %record.user, error = %e, "署名レコードの保存に失敗");
    })?;

    tracing::info!(
        user = %record.user,
        questions = record.questions.len(),
        "署名を発行しました"
    );

    Ok(Json(SignResponse {
        signature: record.signature,
    }))
}
