//! Upload Validation
//! ネットワークに出る前のクライアント側チェックとプレビュー生成

use image::ImageFormat;
use std::fmt;
use std::sync::Arc;

use crate::models::LocalPreview;

/// 最大ファイルサイズ (10 MiB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// 許可フォーマットと対応する Content-Type
const ALLOWED_FORMATS: &[(ImageFormat, &str)] = &[
    (ImageFormat::Jpeg, "image/jpeg"),
    (ImageFormat::Png, "image/png"),
    (ImageFormat::WebP, "image/webp"),
];

// ========================================
// 入出力型
// ========================================

/// ユーザが選択した 1 ファイル（検証前）
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 検証を通過した 1 ファイル
///
/// プレビューはこの時点で生成される（ネットワーク往復より先）
#[derive(Debug, Clone)]
pub struct ValidFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Arc<Vec<u8>>,
    pub preview: LocalPreview,
}

/// 検証で弾かれた理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    TooLarge { size: usize },
    UnsupportedType,
}

/// 検証で弾かれた 1 ファイル
#[derive(Debug, Clone)]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: RejectReason,
}

impl fmt::Display for RejectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectReason::TooLarge { size } => write!(
                f,
                "file \"{}\" is too large: {} bytes (max 10 MiB)",
                self.file_name, size
            ),
            RejectReason::UnsupportedType => write!(
                f,
                "file \"{}\" has an unsupported format (allowed: JPEG, PNG, WebP)",
                self.file_name
            ),
        }
    }
}

// ========================================
// 検証
// ========================================

/// バッチを有効/無効に振り分ける
///
/// 無効ファイルはネットワークに一切出さない。有効ファイルは
/// その場でプレビューを生成して返す。
pub fn split_valid(files: Vec<CandidateFile>) -> (Vec<ValidFile>, Vec<RejectedFile>) {
    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for file in files {
        // サイズチェックが先（巨大ファイルのフォーマット判定を避ける）
        if file.bytes.len() > MAX_FILE_SIZE {
            rejected.push(RejectedFile {
                file_name: file.file_name,
                reason: RejectReason::TooLarge {
                    size: file.bytes.len(),
                },
            });
            continue;
        }

        let content_type = match detect_content_type(&file.bytes) {
            Some(ct) => ct,
            None => {
                rejected.push(RejectedFile {
                    file_name: file.file_name,
                    reason: RejectReason::UnsupportedType,
                });
                continue;
            }
        };

        let bytes = Arc::new(file.bytes);
        let preview = LocalPreview::new(content_type, Arc::clone(&bytes));

        valid.push(ValidFile {
            file_name: file.file_name,
            content_type,
            bytes,
            preview,
        });
    }

    (valid, rejected)
}

/// マジックバイトからフォーマットを判定（拡張子は信用しない）
fn detect_content_type(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    ALLOWED_FORMATS
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, ct)| *ct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::new(1, 1);
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn tiny_jpeg() -> Vec<u8> {
        let img = image::RgbImage::new(1, 1);
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Jpeg)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_valid_formats_pass() {
        let files = vec![
            CandidateFile {
                file_name: "a.png".into(),
                bytes: tiny_png(),
            },
            CandidateFile {
                file_name: "b.jpg".into(),
                bytes: tiny_jpeg(),
            },
        ];

        let (valid, rejected) = split_valid(files);
        assert_eq!(valid.len(), 2);
        assert!(rejected.is_empty());
        assert_eq!(valid[0].content_type, "image/png");
        assert_eq!(valid[1].content_type, "image/jpeg");
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let files = vec![CandidateFile {
            file_name: "notes.txt".into(),
            bytes: b"definitely not an image".to_vec(),
        }];

        let (valid, rejected) = split_valid(files);
        assert!(valid.is_empty());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].reason, RejectReason::UnsupportedType);
    }

    #[test]
    fn test_oversized_file_rejected() {
        let files = vec![CandidateFile {
            file_name: "huge.png".into(),
            bytes: vec![0u8; MAX_FILE_SIZE + 1],
        }];

        let (valid, rejected) = split_valid(files);
        assert!(valid.is_empty());
        assert!(matches!(
            rejected[0].reason,
            RejectReason::TooLarge { size } if size == MAX_FILE_SIZE + 1
        ));
    }

    #[test]
    fn test_mixed_batch_keeps_valid_subset() {
        let files = vec![
            CandidateFile {
                file_name: "ok.png".into(),
                bytes: tiny_png(),
            },
            CandidateFile {
                file_name: "bad.gif".into(),
                bytes: b"GIF89a\x00\x00".to_vec(),
            },
        ];

        let (valid, rejected) = split_valid(files);
        assert_eq!(valid.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(valid[0].file_name, "ok.png");
    }

    #[test]
    fn test_preview_generated_for_valid_files() {
        let bytes = tiny_png();
        let (valid, _) = split_valid(vec![CandidateFile {
            file_name: "a.png".into(),
            bytes: bytes.clone(),
        }]);

        assert_eq!(valid[0].preview.bytes(), bytes.as_slice());
        assert_eq!(valid[0].preview.content_type, "image/png");
    }
}
