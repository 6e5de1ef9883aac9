//! # 批量图片上传工具：终端入口
//!
//! 本文件仅负责日志初始化、设置加载与命令循环。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::sync::Arc;

use batch_uploader::console::{self, PromptConfirmer, StdoutNotifier, HELP_TEXT};
use batch_uploader::error::AppError;
use batch_uploader::settings::{CredentialStore, JsonSettingsStore};
use batch_uploader::upload::{UploadConfig, UploadCoordinator, Uploader};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let store = JsonSettingsStore::default_location()?;
    log::info!("setup: settings file {}", store.path().display());

    let credentials = store.load();
    if !credentials.is_configured() {
        log::warn!("setup: 尚未配置 API Key / API 地址，请使用 key / endpoint 命令设置");
    }

    let uploader = match Uploader::new(store.load_upload_config()) {
        Ok(uploader) => uploader,
        Err(err) => {
            log::error!("setup: 上传配置无效，回退默认配置: {err}");
            Uploader::new(UploadConfig::default())?
        }
    };

    log::info!("setup: upload config {:?}", uploader.config());

    let lines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let coordinator = UploadCoordinator::new(
        uploader,
        PromptConfirmer::new(Arc::clone(&lines)),
        StdoutNotifier,
    );

    log::info!("setup: complete");
    println!("{HELP_TEXT}");

    let remaining = console::run_session(&coordinator, &store, &lines).await?;
    if !remaining.is_empty() {
        log::info!("退出时仍有 {} 张图片未上传", remaining.len());
    }

    log::info!("bye");
    Ok(())
}
