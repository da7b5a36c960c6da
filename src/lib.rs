//! Rental Photo Admin Client
//! 賃貸物件バックエンドの写真管理 API を叩く管理用クライアント
//!
//! 構成:
//! - `session` — Bearer トークンの一元管理（期限切れ時に自動リフレッシュ）
//! - `api`     — REST トランスポート層（reqwest）
//! - `photos`  — アップロード・マージ・ポーリングのコアフロー

pub mod api;
pub mod models;
pub mod photos;
pub mod session;

pub use api::{ApiError, PhotoApi};
pub use photos::manager::{PhotoManager, UploadReport};
pub use session::{Session, SessionError};
