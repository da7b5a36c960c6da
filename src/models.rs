//! Data Models
//! Photo, TokenPair などのデータ構造定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ========================================
// Processing Status
// ========================================

/// サーバ側の画像後処理（サムネイル生成など）の状態
///
/// リスト応答にフィールドが無い場合は処理済みとみなす
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, ProcessingStatus::Pending)
    }
}

// ========================================
// Local Preview
// ========================================

/// ローカルプレビュー（クライアント専用・一時的）
///
/// アップロード直後、サーバがサムネイルを生成するまでの間だけ
/// 元ファイルのバイト列を表示用に保持する。ステータスが
/// `completed` / `failed` になった時点で破棄される。
#[derive(Debug, Clone)]
pub struct LocalPreview {
    pub id: Uuid,
    pub content_type: &'static str,
    bytes: Arc<Vec<u8>>,
}

impl LocalPreview {
    pub fn new(content_type: &'static str, bytes: Arc<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type,
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 元ファイルのサイズ
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

// ========================================
// Photo
// ========================================

/// 物件写真（API返却レコード + クライアント側の楽観的状態）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub apartment_id: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub sort_order: i64,
    pub is_cover: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    /// pending の間だけ存在するクライアント専用フィールド
    #[serde(skip)]
    pub local_preview: Option<LocalPreview>,
}

impl Photo {
    /// 表示に使う URL（サムネイルがまだ無ければ本体 URL）
    pub fn display_url(&self) -> &str {
        self.thumbnail_url.as_deref().unwrap_or(&self.url)
    }
}

/// GET /photos/{apartment_id} のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoListResponse {
    pub items: Vec<Photo>,
    pub total: usize,
}

// ========================================
// Photo Requests
// ========================================

/// PATCH /photos/{photo_id} のリクエスト（部分更新）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_cover: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

/// 並び替え 1 件分 (id, 新しい位置)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoOrderUpdate {
    pub id: i64,
    pub sort_order: i64,
}

/// POST /photos/bulk-update のリクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkPhotoUpdateRequest {
    pub updates: Vec<PhotoOrderUpdate>,
}

// ========================================
// Auth
// ========================================

/// POST /auth/login・/auth/refresh が返すトークンペア
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}
