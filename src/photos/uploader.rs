//! Sequential Uploader
//! バッチを 1 ファイルずつ順番に送信し、楽観的レコードを生成する

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{ApiError, PhotoApi};
use crate::models::{Photo, ProcessingStatus};
use crate::photos::validate::ValidFile;

/// バッチ内の 1 ファイルの送信失敗
///
/// これが起きた時点でバッチの残りは送信されない
#[derive(Debug)]
pub struct UploadFailure {
    pub file_name: String,
    pub error: ApiError,
}

/// バッチ送信の結果
#[derive(Debug)]
pub struct BatchOutcome {
    /// 失敗前に確定した楽観的レコード（ロールバックしない）
    pub uploaded: Vec<Photo>,
    pub failure: Option<UploadFailure>,
    /// 粗い進捗 (完了ファイル数 / 総ファイル数)
    pub progress: u8,
}

impl BatchOutcome {
    pub fn empty() -> Self {
        Self {
            uploaded: Vec::new(),
            failure: None,
            progress: 0,
        }
    }
}

/// 逐次アップローダ
///
/// ファイル i+1 はファイル i のレスポンスが返るまで送信しない。
/// 自動リトライはしない（ユーザが再選択して再送する）。
pub struct Uploader {
    api: Arc<PhotoApi>,
}

impl Uploader {
    pub fn new(api: Arc<PhotoApi>) -> Self {
        Self { api }
    }

    /// バッチを順番に送信する
    ///
    /// 成功ごとに `on_uploaded` へ楽観的レコード（status=pending、
    /// プレビュー付き）を渡す。失敗したらそこで打ち切る。
    pub async fn upload_batch(
        &self,
        apartment_id: i64,
        files: Vec<ValidFile>,
        mut on_uploaded: impl FnMut(Photo),
    ) -> BatchOutcome {
        let total = files.len();
        if total == 0 {
            return BatchOutcome::empty();
        }

        let mut uploaded = Vec::new();

        for (index, file) in files.into_iter().enumerate() {
            let progress = ((index as f64 / total as f64) * 100.0).round() as u8;
            info!(
                "📤 Uploading {} ({}/{}, {} bytes, {}%)",
                file.file_name,
                index + 1,
                total,
                file.preview.size_bytes(),
                progress
            );

            let result = self
                .api
                .upload_photo(
                    apartment_id,
                    &file.file_name,
                    file.content_type,
                    file.bytes.as_ref().clone(),
                )
                .await;

            match result {
                Ok(mut photo) => {
                    // サーバのフィールドはそのまま、ステータスだけ pending に固定し
                    // ローカルプレビューを添付する
                    photo.processing_status = ProcessingStatus::Pending;
                    photo.local_preview = Some(file.preview.clone());

                    on_uploaded(photo.clone());
                    uploaded.push(photo);
                }
                Err(error) => {
                    warn!("❌ Upload of {} failed, halting batch: {}", file.file_name, error);
                    return BatchOutcome {
                        uploaded,
                        failure: Some(UploadFailure {
                            file_name: file.file_name,
                            error,
                        }),
                        progress,
                    };
                }
            }
        }

        info!("✅ Batch upload complete: {} file(s)", total);
        BatchOutcome {
            uploaded,
            failure: None,
            progress: 100,
        }
    }
}
