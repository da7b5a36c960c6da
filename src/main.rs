use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use rental_photo_admin::models::{ProcessingStatus, TokenPair};
use rental_photo_admin::photos::validate::CandidateFile;
use rental_photo_admin::{PhotoApi, PhotoManager, Session};

// ========================================
// CLI 定義
// ========================================

/// 物件写真の管理 CLI（アップロード・並び替え・カバー設定・削除）
#[derive(Parser)]
#[command(name = "rental-photo-admin", version)]
struct Cli {
    /// バックエンドのベース URL
    #[arg(long, env = "RENTAL_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// 管理ユーザ名（指定時はログインしてトークンを取得）
    #[arg(long, env = "RENTAL_ADMIN_USER")]
    username: Option<String>,

    /// 管理パスワード
    #[arg(long, env = "RENTAL_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// 既存のアクセストークン（ログインの代わり）
    #[arg(long, env = "RENTAL_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// 既存のリフレッシュトークン
    #[arg(long, env = "RENTAL_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 物件の写真一覧を表示
    List { apartment_id: i64 },

    /// 写真をアップロード（複数可、1 ファイルずつ順番に送信）
    Upload {
        apartment_id: i64,
        /// アップロードするファイル
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// サーバ側の画像処理が終わるまでポーリングして待つ
        #[arg(long)]
        watch: bool,
    },

    /// 処理待ちの写真が無くなるまでポーリングして待つ
    Watch { apartment_id: i64 },

    /// 写真を削除
    Delete {
        apartment_id: i64,
        photo_id: i64,
        /// 確認プロンプトをスキップ
        #[arg(long)]
        yes: bool,
    },

    /// 写真をカバーに設定
    SetCover { apartment_id: i64, photo_id: i64 },

    /// 表示順を指定して並び替え（先頭が sort_order 0）
    Reorder {
        apartment_id: i64,
        #[arg(required = true)]
        photo_ids: Vec<i64>,
    },
}

// ========================================
// メイン
// ========================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ログ初期化
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // セッション構築: ユーザ名/パスワードがあればログイン、
    // なければ既存トークンを使う
    let session = Session::new(cli.api_url.clone()).context("failed to build session")?;
    let session = match (&cli.username, &cli.password, &cli.access_token) {
        (Some(user), Some(pass), _) => {
            let session = Arc::new(session);
            session.login(user, pass).await.context("login failed")?;
            session
        }
        (_, _, Some(access)) => Arc::new(session.with_tokens(TokenPair {
            access_token: access.clone(),
            refresh_token: cli.refresh_token.clone().unwrap_or_default(),
            token_type: "bearer".to_string(),
        })),
        _ => bail!(
            "credentials required: set --username/--password or --access-token (env RENTAL_ADMIN_USER / RENTAL_ACCESS_TOKEN)"
        ),
    };

    let api = Arc::new(PhotoApi::new(cli.api_url.clone(), session).context("failed to build API client")?);

    match cli.command {
        Command::List { apartment_id } => {
            let manager = PhotoManager::new(api, apartment_id);
            manager.refresh().await?;
            print_photos(&manager);
        }

        Command::Upload {
            apartment_id,
            files,
            watch,
        } => {
            let mut candidates = Vec::new();
            for path in &files {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                candidates.push(CandidateFile { file_name, bytes });
            }

            let manager = PhotoManager::new(api, apartment_id);
            let report = manager.upload(candidates).await;

            for rejected in &report.rejected {
                eprintln!("skipped: {}", rejected);
            }
            for photo in &report.uploaded {
                println!("uploaded: id={} url={}", photo.id, photo.url);
            }

            if let Some(failure) = &report.failure {
                bail!(
                    "upload of \"{}\" failed: {} ({} file(s) committed before the failure)",
                    failure.file_name,
                    failure.error,
                    report.uploaded.len()
                );
            }

            if watch {
                info!("⏳ Waiting for server-side image processing...");
                manager.wait_until_idle().await;
                print_photos(&manager);
            }
        }

        Command::Watch { apartment_id } => {
            let manager = PhotoManager::new(api, apartment_id);
            manager.refresh().await?;
            if manager.has_pending() {
                info!("⏳ Waiting for server-side image processing...");
                manager.wait_until_idle().await;
            }
            print_photos(&manager);
        }

        Command::Delete {
            apartment_id,
            photo_id,
            yes,
        } => {
            let confirmed = yes || confirm_delete(photo_id)?;
            let manager = PhotoManager::new(api, apartment_id);
            manager.refresh().await?;
            if manager.delete_photo(photo_id, confirmed).await? {
                println!("deleted photo {}", photo_id);
            } else {
                println!("aborted");
            }
        }

        Command::SetCover {
            apartment_id,
            photo_id,
        } => {
            let manager = PhotoManager::new(api, apartment_id);
            manager.refresh().await?;
            manager.set_cover(photo_id).await?;
            print_photos(&manager);
        }

        Command::Reorder {
            apartment_id,
            photo_ids,
        } => {
            let manager = PhotoManager::new(api, apartment_id);
            manager.refresh().await?;
            manager.reorder(&photo_ids).await?;
            print_photos(&manager);
        }
    }

    Ok(())
}

// ========================================
// ヘルパ
// ========================================

/// 削除前の確認プロンプト
fn confirm_delete(photo_id: i64) -> anyhow::Result<bool> {
    print!("Delete photo {}? [y/N] ", photo_id);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// 現在のリストを表示
fn print_photos(manager: &PhotoManager) {
    let photos = manager.snapshot();
    println!("{} photo(s) for apartment {}:", photos.len(), manager.apartment_id());

    for photo in &photos {
        let cover = if photo.is_cover { " [cover]" } else { "" };
        let status = match photo.processing_status {
            ProcessingStatus::Pending => " (processing…)",
            ProcessingStatus::Failed => " (processing failed)",
            ProcessingStatus::Completed => "",
        };
        println!(
            "  #{:<2} id={:<6} {}{}{}",
            photo.sort_order,
            photo.id,
            photo.display_url(),
            cover,
            status
        );
    }
}
