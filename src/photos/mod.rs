//! Photo Flow Modules
//! アップロード → 楽観的レコード → マージ → ポーリングのコアフロー

pub mod manager;
pub mod poller;
pub mod tracker;
pub mod uploader;
pub mod validate;

pub use manager::{PhotoManager, UploadReport};
pub use poller::POLL_INTERVAL;
pub use tracker::{merge_photos, PhotoCollection};
pub use uploader::{UploadFailure, Uploader};
pub use validate::{CandidateFile, RejectReason, RejectedFile, ValidFile, MAX_FILE_SIZE};
