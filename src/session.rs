//! Session Module
//! Bearer トークンの一元管理（JWT の exp 判定 + 自動リフレッシュ）

use base64::Engine;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::{LoginRequest, RefreshRequest, TokenPair};

/// 認証エンドポイントのプレフィックス
const AUTH_PREFIX: &str = "/admin/api/v1/auth";

/// セッション関連エラー
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not authenticated: no access token")]
    NotAuthenticated,

    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// 現在のトークンペアの唯一の保管場所
///
/// すべての API 呼び出し箇所はここから `get_valid_token()` で
/// アクセストークンを取得する。期限切れならリフレッシュを試み、
/// 失敗した場合は保管中のトークンを破棄してエラーを返す。
pub struct Session {
    http: reqwest::Client,
    base_url: String,
    tokens: Mutex<Option<TokenPair>>,
}

impl Session {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SessionError::LoginFailed(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            tokens: Mutex::new(None),
        })
    }

    /// 既存のトークンペアでセッションを開始（ログイン済みの場合）
    pub fn with_tokens(mut self, pair: TokenPair) -> Self {
        self.tokens = Mutex::new(Some(pair));
        self
    }

    /// 非同期コンテキストからのトークン差し替え
    pub async fn set_tokens(&self, pair: TokenPair) {
        *self.tokens.lock().await = Some(pair);
    }

    /// POST /auth/login — ユーザ名とパスワードでトークンペアを取得
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let url = format!("{}{}/login", self.base_url, AUTH_PREFIX);
        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|e| SessionError::LoginFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SessionError::LoginFailed(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        let pair: TokenPair = resp
            .json()
            .await
            .map_err(|e| SessionError::LoginFailed(e.to_string()))?;

        info!("✅ Logged in as {}", username);
        *self.tokens.lock().await = Some(pair);
        Ok(())
    }

    /// 有効なアクセストークンを返す
    ///
    /// 期限切れなら /auth/refresh で更新してから返す。
    /// リフレッシュ失敗時はトークンを破棄する（再ログインが必要）。
    pub async fn get_valid_token(&self) -> Result<String, SessionError> {
        // ロックを保持したままリフレッシュすることで多重リフレッシュを防ぐ
        let mut tokens = self.tokens.lock().await;

        let pair = tokens.as_ref().ok_or(SessionError::NotAuthenticated)?;

        if !token_expired(&pair.access_token) {
            return Ok(pair.access_token.clone());
        }

        let refresh_token = pair.refresh_token.clone();
        match self.refresh(&refresh_token).await {
            Ok(new_pair) => {
                let access = new_pair.access_token.clone();
                *tokens = Some(new_pair);
                Ok(access)
            }
            Err(e) => {
                // 失敗したトークンは残さない
                warn!("❌ Token refresh failed: {}", e);
                *tokens = None;
                Err(e)
            }
        }
    }

    /// POST /auth/refresh
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let url = format!("{}{}/refresh", self.base_url, AUTH_PREFIX);
        let resp = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SessionError::RefreshFailed(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        resp.json()
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))
    }

    /// POST /auth/logout — サーバ側の失効はベストエフォート、ローカルは必ず破棄
    pub async fn logout(&self) {
        let pair = self.tokens.lock().await.take();

        if let Some(pair) = pair {
            let url = format!("{}{}/logout", self.base_url, AUTH_PREFIX);
            let result = self
                .http
                .post(&url)
                .bearer_auth(&pair.access_token)
                .json(&RefreshRequest {
                    refresh_token: pair.refresh_token,
                })
                .send()
                .await;

            if let Err(e) = result {
                warn!("Logout request failed (local tokens already discarded): {}", e);
            }
        }
    }
}

/// JWT の exp クレームを読んで期限切れかどうかを判定
///
/// デコードできないトークンは期限切れ扱い
fn token_expired(token: &str) -> bool {
    let payload = match token.split('.').nth(1) {
        Some(p) => p,
        None => return true,
    };

    let decoded = match base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload) {
        Ok(d) => d,
        Err(_) => return true,
    };

    let claims: serde_json::Value = match serde_json::from_slice(&decoded) {
        Ok(v) => v,
        Err(_) => return true,
    };

    let exp = match claims.get("exp").and_then(|v| v.as_i64()) {
        Some(e) => e,
        None => return true,
    };

    chrono::Utc::now().timestamp() >= exp
}

#[cfg(test)]
mod tests {
    use super::*;

    /// exp だけを持つ JWT もどきを作る
    fn make_token(exp: i64) -> String {
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(b"{}");
        let payload = engine.encode(serde_json::json!({ "exp": exp }).to_string());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_future_exp_is_not_expired() {
        let token = make_token(chrono::Utc::now().timestamp() + 3600);
        assert!(!token_expired(&token));
    }

    #[test]
    fn test_past_exp_is_expired() {
        let token = make_token(chrono::Utc::now().timestamp() - 60);
        assert!(token_expired(&token));
    }

    #[test]
    fn test_garbage_token_counts_as_expired() {
        assert!(token_expired("not-a-jwt"));
        assert!(token_expired("a.!!!.c"));
        assert!(token_expired(""));
    }

    #[test]
    fn test_missing_exp_counts_as_expired() {
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let payload = engine.encode(serde_json::json!({ "sub": "admin" }).to_string());
        let token = format!("{}.{}.sig", engine.encode(b"{}"), payload);
        assert!(token_expired(&token));
    }
}
