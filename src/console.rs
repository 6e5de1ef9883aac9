//! # 终端前端模块
//!
//! ## 设计思路
//!
//! 终端扮演“界面”角色，为核心提供外部协作者：
//! - `PromptConfirmer`：从共享的行读取器读取 `y/N`
//! - `StdoutNotifier`：把终态提示打印到标准输出
//! - `parse_command`：纯函数解析一行输入，便于单元测试
//!
//! 命令行读取器与确认器共享同一个 `Lines`，避免两个读取方抢占 stdin 缓冲。
//!
//! ## 会话循环
//!
//! `run_session` 用 `tokio::select!` 同时等待“进行中的上传”和“下一行输入”：
//! - 上传期间整批集合移交给上传 future，完成后原样（或清空后）交还
//! - 上传期间 `list` / `key` / `endpoint` / `help` 照常处理
//! - 上传期间 `add` / `capture` / `rm` 被拒绝，再次 `upload` 由 Coordinator 以 `InFlight` 拒绝
//! - `biased` 保证上传 future 先于读行被轮询，确认提示总能先拿到输入锁

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::Mutex;

use crate::collection::{FsPicker, ImageCollection, ImagePicker};
use crate::error::AppError;
use crate::settings::{CredentialStore, JsonSettingsStore};
use crate::upload::{
    Attempt, Confirmer, Notifier, UploadCoordinator, UploadTransport, ValidationError,
};

pub const HELP_TEXT: &str = "\
commands:
  add <path>...        pick images from disk
  capture <path>       add a single captured image
  list                 show selected images
  rm <index>           remove image at index
  upload <folder>      upload all images to <folder>
  key <apiKey>         set API key
  endpoint <url>       set API endpoint
  help                 show this help
  quit                 exit";

const BUSY_TEXT: &str = "upload in progress, try again when it finishes";

/// 终端命令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(Vec<PathBuf>),
    Capture(PathBuf),
    List,
    Remove(usize),
    /// 原样保留剩余文本，trim 与空值校验交给 Coordinator。
    Upload(String),
    SetKey(String),
    SetEndpoint(String),
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command, AppError> {
    let line = line.trim_start();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest),
        None => (line.trim_end(), ""),
    };

    match name {
        "" => Ok(Command::Empty),
        "add" => {
            let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(AppError::Console("add 至少需要一个路径".to_string()));
            }
            Ok(Command::Add(paths))
        }
        "capture" => {
            let path = rest.trim();
            if path.is_empty() {
                return Err(AppError::Console("capture 需要一个路径".to_string()));
            }
            Ok(Command::Capture(PathBuf::from(path)))
        }
        "list" | "ls" => Ok(Command::List),
        "rm" => rest
            .trim()
            .parse::<usize>()
            .map(Command::Remove)
            .map_err(|_| AppError::Console(format!("无效的下标：{}", rest.trim()))),
        "upload" => Ok(Command::Upload(rest.to_string())),
        "key" => Ok(Command::SetKey(rest.trim().to_string())),
        "endpoint" => Ok(Command::SetEndpoint(rest.trim().to_string())),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(AppError::Console(format!("未知命令：{}（输入 help 查看帮助）", other))),
    }
}

/// 从共享行读取器读取确认结果；只有 `y` / `yes` 视为同意，EOF 视为取消。
pub struct PromptConfirmer<R> {
    lines: Arc<Mutex<Lines<R>>>,
}

impl<R> PromptConfirmer<R> {
    pub fn new(lines: Arc<Mutex<Lines<R>>>) -> Self {
        Self { lines }
    }
}

impl<R> Confirmer for PromptConfirmer<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn confirm(&self, message: &str) -> impl Future<Output = bool> + Send {
        print!("{} [y/N] ", message);
        let _ = std::io::stdout().flush();

        async move {
            let mut lines = self.lines.lock().await;
            match lines.next_line().await {
                Ok(Some(answer)) => is_affirmative(&answer),
                Ok(None) => false,
                Err(err) => {
                    log::warn!("⚠️ 读取确认输入失败，按取消处理: {}", err);
                    false
                }
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, message: &str) {
        log::debug!("notify: {}", message);
        println!("» {}", message);
    }
}

/// 进行中的上传：持有整批集合，完成后连同结果一起交还。
type PendingUpload<'a> = Pin<Box<dyn Future<Output = (ImageCollection, Attempt)> + 'a>>;

/// 运行终端会话直到 `quit` 或输入结束，返回最终的图片集合。
///
/// 输入结束时若仍有上传进行中，会等待其完成后再返回。
pub async fn run_session<'a, T, C, N, R>(
    coordinator: &'a UploadCoordinator<T, C, N>,
    store: &JsonSettingsStore,
    lines: &Mutex<Lines<R>>,
) -> Result<ImageCollection, AppError>
where
    T: UploadTransport + 'static,
    C: Confirmer,
    N: Notifier,
    R: AsyncBufRead + Unpin + Send,
{
    let mut collection = ImageCollection::new();
    let mut uploading = ImageCollection::new();
    let mut credentials = store.load();
    let mut pending: Option<PendingUpload<'a>> = None;

    loop {
        prompt();

        tokio::select! {
            biased;

            (batch, attempt) = wait_for_upload(&mut pending) => {
                pending = None;
                uploading.clear();
                log::debug!("upload attempt finished: succeeded={}", attempt.succeeded());
                collection = batch;
            }

            line = read_line(lines) => {
                let Some(line) = line? else {
                    break;
                };

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };

                let busy = pending.is_some();
                match command {
                    Command::Empty => {}
                    Command::Help => println!("{HELP_TEXT}"),
                    Command::Quit => break,
                    Command::Add(_) | Command::Capture(_) | Command::Remove(_) if busy => {
                        println!("{BUSY_TEXT}");
                    }
                    Command::Add(paths) => {
                        let picked = FsPicker::new(paths).pick_multiple();
                        println!("added {} image(s)", picked.len());
                        collection.append(picked);
                    }
                    Command::Capture(path) => match FsPicker::new([path]).capture_one() {
                        Some(image) => {
                            println!("added {}", image.file_name());
                            collection.push(image);
                        }
                        None => println!("nothing captured"),
                    },
                    Command::List => {
                        if coordinator.is_uploading() {
                            println!("uploading {} image(s):", uploading.len());
                            print_collection(&uploading);
                        } else {
                            print_collection(&collection);
                        }
                    }
                    Command::Remove(index) => match collection.remove(index) {
                        Some(image) => println!("removed {}", image.file_name()),
                        None => println!("no image at index {index}"),
                    },
                    Command::Upload(folder_name) if busy => {
                        let mut batch = uploading.clone();
                        let attempt = coordinator
                            .attempt_upload(&mut batch, &folder_name, &credentials)
                            .await;
                        if matches!(attempt, Attempt::Rejected(ValidationError::InFlight)) {
                            println!("{BUSY_TEXT}");
                        }
                    }
                    Command::Upload(folder_name) => {
                        let batch = std::mem::take(&mut collection);
                        uploading = batch.clone();
                        let request_credentials = credentials.clone();
                        let upload: PendingUpload<'a> = Box::pin(async move {
                            let mut batch = batch;
                            let attempt = coordinator
                                .attempt_upload(&mut batch, &folder_name, &request_credentials)
                                .await;
                            (batch, attempt)
                        });
                        pending = Some(upload);
                    }
                    Command::SetKey(value) => {
                        let mut updated = store.load();
                        updated.api_key = Some(value).filter(|v| !v.is_empty());
                        if let Err(err) = store.save_credentials(&updated) {
                            log::error!("保存 API Key 失败: {err}");
                        }
                        credentials = store.load();
                    }
                    Command::SetEndpoint(value) => {
                        let mut updated = store.load();
                        updated.api_endpoint = Some(value).filter(|v| !v.is_empty());
                        if let Err(err) = store.save_credentials(&updated) {
                            log::error!("保存 API 地址失败: {err}");
                        }
                        credentials = store.load();
                    }
                }
            }
        }
    }

    if let Some(upload) = pending.take() {
        log::info!("等待进行中的上传结束");
        let (batch, _) = upload.await;
        collection = batch;
    }

    Ok(collection)
}

async fn wait_for_upload(pending: &mut Option<PendingUpload<'_>>) -> (ImageCollection, Attempt) {
    match pending {
        Some(upload) => upload.await,
        None => std::future::pending().await,
    }
}

async fn read_line<R>(lines: &Mutex<Lines<R>>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    lines.lock().await.next_line().await
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_collection(collection: &ImageCollection) {
    if collection.is_empty() {
        println!("(no images)");
    }
    for (index, image) in collection.as_slice().iter().enumerate() {
        println!("{index:>3}  {}", image.path().display());
    }
}
