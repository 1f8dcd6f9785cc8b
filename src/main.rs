//! アプリケーションのエントリポイントとランタイム初期化。

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod config;
mod convert;
mod error;
mod events;
mod input;
mod jobs;
mod layout;
mod log;
mod processor;
mod session;
mod shortcuts;
mod stats;
mod ui;
mod worker;

use config::Config;

/// ファイルロギングを初期化し、非同期ガードを生存させる。
fn init_logging(log_file: &str) -> Result<WorkerGuard> {
    // TUIの標準出力を汚さないよう、ファイルへ直接書き込む。
    let file_appender = tracing_appender::rolling::never(".", log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
/// エントリポイント：設定読込→ログ初期化→UI開始→端末復元。
async fn main() -> Result<()> {
    // ログ出力先が設定にあるため、設定を先に読み込む。
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;

    let _log_guard = init_logging(&cfg.log.file)?;
    tracing::info!("app starting (server {})", cfg.server.base_url);

    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal, cfg_path, cfg).await;
    // 端末の状態を必ず元に戻す。
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e}");
    }
    tracing::info!("app exiting");
    res
}
