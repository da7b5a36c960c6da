//! Photo Manager
//! 共有状態の持ち主。アップロード・更新操作とポーラの arm/disarm を束ねる

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{ApiError, PhotoApi};
use crate::models::{Photo, PhotoOrderUpdate, PhotoUpdateRequest};
use crate::photos::poller::{spawn_poller, POLL_INTERVAL};
use crate::photos::tracker::PhotoCollection;
use crate::photos::uploader::{UploadFailure, Uploader};
use crate::photos::validate::{split_valid, CandidateFile, RejectedFile};

/// アップロード 1 バッチの結果報告
#[derive(Debug)]
pub struct UploadReport {
    /// 検証で弾かれたファイル（ネットワークには出ていない）
    pub rejected: Vec<RejectedFile>,
    /// 確定した楽観的レコード
    pub uploaded: Vec<Photo>,
    /// バッチを打ち切った失敗（あれば）
    pub failure: Option<UploadFailure>,
    pub progress: u8,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.rejected.is_empty()
    }
}

/// 物件 1 件の写真リストを管理する
///
/// インメモリリストの変更はすべてここを経由する。変更は
/// 「解決したネットワーク応答から」だけ行い、楽観的なのは
/// アップロードプレビューのみ。この値を drop すると進行中の
/// ポーリング応答は適用されず捨てられる。
pub struct PhotoManager {
    api: Arc<PhotoApi>,
    apartment_id: i64,
    photos: Arc<Mutex<PhotoCollection>>,
    watching: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl PhotoManager {
    pub fn new(api: Arc<PhotoApi>, apartment_id: i64) -> Self {
        Self {
            api,
            apartment_id,
            photos: Arc::new(Mutex::new(PhotoCollection::new())),
            watching: Arc::new(AtomicBool::new(false)),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// テスト・特殊用途向けに間隔を変更
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn apartment_id(&self) -> i64 {
        self.apartment_id
    }

    /// 現在のリストのコピー
    pub fn snapshot(&self) -> Vec<Photo> {
        self.photos.lock().unwrap().snapshot()
    }

    pub fn has_pending(&self) -> bool {
        self.photos.lock().unwrap().has_pending()
    }

    /// ポーラが動いているか（watching 状態か）
    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    // ========================================
    // 取得・アップロード
    // ========================================

    /// サーバからリストを取得してマージする
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let resp = self.api.list_photos(self.apartment_id).await?;
        {
            let mut photos = self.photos.lock().unwrap();
            photos.reconcile(resp.items);
        }
        self.ensure_polling();
        Ok(())
    }

    /// ファイル選択 → 検証 → 逐次アップロード
    ///
    /// 無効ファイルだけのバッチは何もしない（ネットワーク呼び出しゼロ）。
    /// 成功したファイルごとに楽観的レコードがリストへ追加され、
    /// バッチ終了後に必要ならポーリングが始まる。
    pub async fn upload(&self, files: Vec<CandidateFile>) -> UploadReport {
        let (valid, rejected) = split_valid(files);

        for r in &rejected {
            warn!("{}", r);
        }

        if valid.is_empty() {
            return UploadReport {
                rejected,
                uploaded: Vec::new(),
                failure: None,
                progress: 0,
            };
        }

        let photos = Arc::clone(&self.photos);
        let outcome = Uploader::new(Arc::clone(&self.api))
            .upload_batch(self.apartment_id, valid, move |photo| {
                photos.lock().unwrap().push(photo);
            })
            .await;

        self.ensure_polling();

        UploadReport {
            rejected,
            uploaded: outcome.uploaded,
            failure: outcome.failure,
            progress: outcome.progress,
        }
    }

    // ========================================
    // 削除・並び替え・カバー設定
    // ========================================

    /// 写真を削除する（明示的な確認が必須）
    ///
    /// `confirmed` が false ならリクエストを出さず Ok(false) を返す。
    /// ローカルリストからの除去はサーバ応答の後。
    pub async fn delete_photo(&self, photo_id: i64, confirmed: bool) -> Result<bool, ApiError> {
        if !confirmed {
            info!("Delete of photo {} not confirmed, aborting", photo_id);
            return Ok(false);
        }

        self.api.delete_photo(photo_id).await?;
        self.photos.lock().unwrap().remove(photo_id);
        info!("🗑️  Deleted photo {}", photo_id);
        Ok(true)
    }

    /// 表示順 `ordered_ids` で並び替える
    ///
    /// (id, 位置) の一括リクエストを送り、成功後にローカルへ
    /// 0..N-1 を振り直す。
    pub async fn reorder(&self, ordered_ids: &[i64]) -> Result<(), ApiError> {
        let updates: Vec<PhotoOrderUpdate> = ordered_ids
            .iter()
            .enumerate()
            .map(|(position, id)| PhotoOrderUpdate {
                id: *id,
                sort_order: position as i64,
            })
            .collect();

        self.api.bulk_update(updates).await?;
        self.photos.lock().unwrap().renumber(ordered_ids);
        info!("Updated sort order for {} photo(s)", ordered_ids.len());
        Ok(())
    }

    /// 指定写真をカバーに設定する
    ///
    /// 成功後、ローカルではその 1 枚だけ is_cover=true にする。
    /// サーバ側の一意性はサーバが真実（次回 refresh で追随）。
    pub async fn set_cover(&self, photo_id: i64) -> Result<(), ApiError> {
        self.api
            .update_photo(
                photo_id,
                PhotoUpdateRequest {
                    is_cover: Some(true),
                    sort_order: None,
                },
            )
            .await?;

        self.photos.lock().unwrap().set_cover(photo_id);
        info!("Set photo {} as cover", photo_id);
        Ok(())
    }

    // ========================================
    // ポーリング制御
    // ========================================

    /// 最新状態を見て arm/disarm を判定する
    ///
    /// pending があり、かつポーラが動いていなければ起動する。
    /// ループ自身は pending が無くなった時点で終了する。
    /// 判定と arm はリストのロックを持ったまま行う。ポーラの disarm も
    /// 同じロック下で行われるため、pending 追加と終了判定が交差しても
    /// 必ずどちらかがポーラを持つ。
    fn ensure_polling(&self) {
        let photos = self.photos.lock().unwrap();
        if photos.has_pending() && !self.watching.swap(true, Ordering::SeqCst) {
            // ループは pending ゼロか持ち主の破棄で自律終了する
            let _ = spawn_poller(
                Arc::clone(&self.api),
                self.apartment_id,
                Arc::downgrade(&self.photos),
                Arc::clone(&self.watching),
                self.poll_interval,
            );
        }
    }

    /// ポーリングが終わる（watching → idle）まで待つ
    pub async fn wait_until_idle(&self) {
        while self.is_watching() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
