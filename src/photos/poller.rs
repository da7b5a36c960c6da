//! Processing Poller
//! pending が残っている間だけ 3 秒間隔でサーバ状態を再取得する

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::PhotoApi;
use crate::photos::tracker::PhotoCollection;

/// 再取得間隔
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// ポーリングループを起動する（状態: idle → watching）
///
/// - 各 tick でリストを再取得し、マージしてから arm/disarm を再判定する。
///   判定は常に最新の状態に対して行う（タイマ起動時のスナップショットではない）。
/// - 再取得の失敗は警告を出すだけでループは止めない。次の tick が自動リトライ。
///   リトライ回数は制限しない。
/// - 状態への参照は Weak で持つ。持ち主が破棄されたら遅延レスポンスは
///   一切適用せず静かに終了する。
/// - pending が 0 になったら終了する（watching → idle）。disarm は写真リストの
///   ロックを持ったまま行う。再アーム判定（ensure_polling）が同じロックを取るため、
///   「pending を追加したのにどちらもポーラを持たない」隙間ができない。
pub(crate) fn spawn_poller(
    api: Arc<PhotoApi>,
    apartment_id: i64,
    state: Weak<Mutex<PhotoCollection>>,
    watching: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Polling started for apartment {}", apartment_id);

        loop {
            tokio::time::sleep(interval).await;

            // 持ち主が消えていたらリクエストを出さずに終了
            if state.upgrade().is_none() {
                debug!("Photo state dropped, stopping poller for apartment {}", apartment_id);
                watching.store(false, Ordering::SeqCst);
                break;
            }

            match api.list_photos(apartment_id).await {
                Ok(resp) => {
                    // レスポンス待ちの間に破棄された場合も適用しない
                    let Some(strong) = state.upgrade() else {
                        debug!("Discarding late refetch response for apartment {}", apartment_id);
                        watching.store(false, Ordering::SeqCst);
                        break;
                    };

                    let mut photos = strong.lock().unwrap();
                    photos.reconcile(resp.items);

                    if !photos.has_pending() {
                        // ロック保持中に disarm（再アーム判定との直列化）
                        watching.store(false, Ordering::SeqCst);
                        debug!("No pending photos left for apartment {}, polling stopped", apartment_id);
                        break;
                    }
                }
                Err(e) => {
                    // 回復可能エラー: ループは維持し、次の tick で再試行
                    warn!("❌ Photo list refetch failed for apartment {} (will retry next tick): {}", apartment_id, e);
                }
            }
        }
    })
}
