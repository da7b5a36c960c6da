//! Photo API Client
//! /admin/api/v1/photos エンドポイントへのトランスポート層

use reqwest::multipart;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    BulkPhotoUpdateRequest, Photo, PhotoListResponse, PhotoOrderUpdate, PhotoUpdateRequest,
};
use crate::session::{Session, SessionError};

/// 管理 API のプレフィックス
const ADMIN_API_PREFIX: &str = "/admin/api/v1";

/// リクエストタイムアウト
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ========================================
// エラー型
// ========================================

/// API 呼び出しエラー
///
/// トークン取得の失敗もリクエスト失敗と同等に扱う
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

// ========================================
// クライアント
// ========================================

/// 写真管理 API クライアント
///
/// 全リクエストに Session 由来の Bearer トークンを付与する
pub struct PhotoApi {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl PhotoApi {
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, ADMIN_API_PREFIX, path)
    }

    /// GET /photos/{apartment_id} — 物件の写真一覧
    pub async fn list_photos(&self, apartment_id: i64) -> Result<PhotoListResponse, ApiError> {
        let token = self.session.get_valid_token().await?;
        let url = self.url(&format!("/photos/{}", apartment_id));

        debug!("Fetching photo list for apartment {}", apartment_id);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let resp = check_status(resp).await?;
        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// POST /photos/{apartment_id}/upload — 1 ファイルのアップロード
    ///
    /// レスポンスは同期的に写真レコードを返すが、画像の後処理
    /// （サムネイル生成）はサーバ側で非同期に行われる。
    pub async fn upload_photo(
        &self,
        apartment_id: i64,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Photo, ApiError> {
        let token = self.session.get_valid_token().await?;
        let url = self.url(&format!("/photos/{}/upload", apartment_id));

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("apartment_id", apartment_id.to_string());

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let resp = check_status(resp).await?;
        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// PATCH /photos/{photo_id} — 部分更新（カバー設定など）
    pub async fn update_photo(
        &self,
        photo_id: i64,
        update: PhotoUpdateRequest,
    ) -> Result<Photo, ApiError> {
        let token = self.session.get_valid_token().await?;
        let url = self.url(&format!("/photos/{}", photo_id));

        let resp = self
            .http
            .patch(&url)
            .bearer_auth(token)
            .json(&update)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let resp = check_status(resp).await?;
        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// POST /photos/bulk-update — 並び順の一括更新（全体で成功/失敗）
    pub async fn bulk_update(&self, updates: Vec<PhotoOrderUpdate>) -> Result<(), ApiError> {
        let token = self.session.get_valid_token().await?;
        let url = self.url("/photos/bulk-update");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&BulkPhotoUpdateRequest { updates })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        check_status(resp).await?;
        Ok(())
    }

    /// DELETE /photos/{photo_id} — 成功時はボディなし
    pub async fn delete_photo(&self, photo_id: i64) -> Result<(), ApiError> {
        let token = self.session.get_valid_token().await?;
        let url = self.url(&format!("/photos/{}", photo_id));

        let resp = self
            .http
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        check_status(resp).await?;
        Ok(())
    }
}

/// 非 2xx をエラーへ変換（ボディはそのままメッセージに使う）
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Status(status.as_u16(), body))
    }
}
