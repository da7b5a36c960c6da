//! Processing Tracker
//! サーバ真実とローカル楽観的状態のマージ（純粋・冪等）

use crate::models::{Photo, ProcessingStatus};

/// マージ規則:
/// - サーバレコードが `completed`（または指定なし）→ サーバレコードで完全置換、
///   ローカルプレビューは破棄
/// - `pending` / `failed` → フィールドはすべてサーバ値、ローカルプレビューだけ
///   直前のレコードから引き継ぐ（サムネイル未生成の間のちらつき防止）
/// - サーバスナップショットに無いローカルレコードは落とす（サーバが真実）
///
/// 同じスナップショットで再適用しても結果は変わらない（冪等）。
pub fn merge_photos(local: &[Photo], server: Vec<Photo>) -> Vec<Photo> {
    let mut merged: Vec<Photo> = server
        .into_iter()
        .map(|mut photo| {
            match photo.processing_status {
                ProcessingStatus::Completed => {
                    photo.local_preview = None;
                }
                ProcessingStatus::Pending | ProcessingStatus::Failed => {
                    if photo.local_preview.is_none() {
                        if let Some(prior) = local.iter().find(|p| p.id == photo.id) {
                            photo.local_preview = prior.local_preview.clone();
                        }
                    }
                }
            }
            photo
        })
        .collect();

    // sort_order 昇順を常に保つ
    merged.sort_by_key(|p| p.sort_order);
    merged
}

// ========================================
// Photo Collection
// ========================================

/// 物件 1 件分の写真リスト（インメモリの共有状態）
///
/// 変更経路は 3 つだけ:
/// (a) アップローダの追記、(b) マージ、(c) サーバ確認済みの
/// 削除・並び替え・カバー設定。楽観的変更はアップロードプレビューのみ。
#[derive(Debug, Default)]
pub struct PhotoCollection {
    photos: Vec<Photo>,
}

impl PhotoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Photo> {
        self.photos.clone()
    }

    /// pending の写真が 1 枚でもあるか（ポーラの arm 条件）
    pub fn has_pending(&self) -> bool {
        self.photos
            .iter()
            .any(|p| p.processing_status.is_pending())
    }

    /// アップロード成功後の楽観的レコードを追加
    pub fn push(&mut self, photo: Photo) {
        self.photos.push(photo);
        self.photos.sort_by_key(|p| p.sort_order);
    }

    /// サーバスナップショットとマージ
    pub fn reconcile(&mut self, server: Vec<Photo>) {
        self.photos = merge_photos(&self.photos, server);
    }

    /// 削除確認後のローカル反映
    pub fn remove(&mut self, photo_id: i64) {
        self.photos.retain(|p| p.id != photo_id);
    }

    /// 並び替え成功後のローカル反映: 表示順どおりに 0..N-1 を振り直す
    pub fn renumber(&mut self, ordered_ids: &[i64]) {
        for (position, id) in ordered_ids.iter().enumerate() {
            if let Some(photo) = self.photos.iter_mut().find(|p| p.id == *id) {
                photo.sort_order = position as i64;
            }
        }
        self.photos.sort_by_key(|p| p.sort_order);
    }

    /// カバー設定成功後のローカル反映: 指定 id だけ true、他は false
    pub fn set_cover(&mut self, photo_id: i64) {
        for photo in &mut self.photos {
            photo.is_cover = photo.id == photo_id;
        }
    }
}
