//! # 上传编排模块
//!
//! ## 设计思路
//!
//! `UploadCoordinator` 负责一次上传尝试的完整流程，按顺序快速失败：
//! 1. 图片为空 → 提示 `no images selected`
//! 2. 文件夹名（trim 后）为空 → 提示 `folder name required`
//! 3. 弹出确认（数量 + 目标文件夹），取消则静默结束
//! 4. 在独立任务中调用 Uploader，等待结果
//! 5. 成功才清空集合；失败保持集合原样
//!
//! 每次尝试恰好产生一条终态提示；用户取消不产生提示。
//!
//! ## 实现思路
//!
//! - 集合以 `&mut` 借用贯穿整个尝试，上传进行中不可能被修改。
//! - `in_flight` 原子标志 + RAII guard 拒绝并发的第二次尝试。
//! - Uploader 运行在 `tokio::spawn` 的任务中，任务异常视为失败结果。

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::collection::ImageCollection;
use crate::settings::Credentials;

use super::{UploadError, UploadOutcome, UploadRequest, UploadTransport, ValidationError};

pub const UPLOAD_SUCCEEDED_MESSAGE: &str = "upload succeeded";
pub const UPLOAD_FAILED_MESSAGE: &str = "upload failed";

/// 阻塞式是/否确认（由界面实现）。
pub trait Confirmer {
    fn confirm(&self, message: &str) -> impl Future<Output = bool> + Send;
}

/// 终态提示出口（由界面实现）。
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// 一次上传尝试的结局。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// 前置校验未通过，未发出网络请求。
    Rejected(ValidationError),
    /// 用户在确认环节取消。
    Cancelled,
    /// 已调用 Uploader。
    Finished(UploadOutcome),
}

impl Attempt {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Finished(outcome) if outcome.succeeded)
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct UploadCoordinator<T, C, N> {
    transport: Arc<T>,
    confirmer: C,
    notifier: N,
    in_flight: AtomicBool,
}

impl<T, C, N> UploadCoordinator<T, C, N>
where
    T: UploadTransport + 'static,
    C: Confirmer,
    N: Notifier,
{
    pub fn new(transport: T, confirmer: C, notifier: N) -> Self {
        Self {
            transport: Arc::new(transport),
            confirmer,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 执行一次上传尝试。
    ///
    /// 只有 Uploader 返回成功时才会清空 `collection`。
    pub async fn attempt_upload(
        &self,
        collection: &mut ImageCollection,
        folder_name: &str,
        credentials: &Credentials,
    ) -> Attempt {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            log::warn!("⏳ 已有上传进行中，忽略本次请求");
            return Attempt::Rejected(ValidationError::InFlight);
        };

        if collection.is_empty() {
            return self.reject(ValidationError::NoImages);
        }

        let folder_name = folder_name.trim();
        if folder_name.is_empty() {
            return self.reject(ValidationError::MissingFolderName);
        }

        let prompt = confirmation_message(collection.len(), folder_name);
        if !self.confirmer.confirm(&prompt).await {
            log::info!("🚫 用户取消上传");
            return Attempt::Cancelled;
        }

        let request = UploadRequest {
            images: collection.snapshot(),
            folder_name: folder_name.to_string(),
            credentials: credentials.clone(),
        };
        let outcome = self.run_upload(request).await;

        if outcome.succeeded {
            collection.clear();
            self.notifier.notify(UPLOAD_SUCCEEDED_MESSAGE);
        } else {
            log::warn!(
                "上传未成功 - status={:?} detail={}",
                outcome.status_code,
                outcome.error_detail.as_deref().unwrap_or("-")
            );
            self.notifier.notify(UPLOAD_FAILED_MESSAGE);
        }

        Attempt::Finished(outcome)
    }

    fn reject(&self, error: ValidationError) -> Attempt {
        log::info!("上传前置校验未通过: {}", error);
        self.notifier.notify(&error.to_string());
        Attempt::Rejected(error)
    }

    async fn run_upload(&self, request: UploadRequest) -> UploadOutcome {
        let transport = Arc::clone(&self.transport);
        match tokio::spawn(async move { transport.upload(request).await }).await {
            Ok(outcome) => outcome,
            Err(err) => UploadOutcome::failure(UploadError::TaskFailed(err.to_string())),
        }
    }
}

/// 确认弹窗文案。
pub fn confirmation_message(count: usize, folder_name: &str) -> String {
    format!("Upload {} image(s) to folder \"{}\"?", count, folder_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ImageRef;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Default)]
    struct RecordingTransport {
        calls: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<UploadRequest>>>,
        succeed: bool,
    }

    impl UploadTransport for RecordingTransport {
        fn upload(&self, request: UploadRequest) -> impl Future<Output = UploadOutcome> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().expect("requests lock").push(request);
            let succeed = self.succeed;
            async move {
                if succeed {
                    UploadOutcome::success(200, None)
                } else {
                    UploadOutcome::failure(UploadError::Network("connection refused".to_string()))
                }
            }
        }
    }

    struct PanickingTransport;

    fn explode() -> UploadOutcome {
        panic!("transport exploded")
    }

    impl UploadTransport for PanickingTransport {
        fn upload(&self, _request: UploadRequest) -> impl Future<Output = UploadOutcome> + Send {
            async move { explode() }
        }
    }

    struct FixedConfirmer {
        answer: bool,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl Confirmer for FixedConfirmer {
        fn confirm(&self, message: &str) -> impl Future<Output = bool> + Send {
            self.prompts.lock().expect("prompts lock").push(message.to_string());
            let answer = self.answer;
            async move { answer }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.messages.lock().expect("messages lock").push(message.to_string());
        }
    }

    fn confirmer(answer: bool) -> FixedConfirmer {
        FixedConfirmer {
            answer,
            prompts: Arc::default(),
        }
    }

    fn images(names: &[&str]) -> ImageCollection {
        names.iter().map(|n| ImageRef::from(*n)).collect()
    }

    fn valid_credentials() -> Credentials {
        Credentials::new("key", "https://example.com/upload")
    }

    #[tokio::test]
    async fn empty_collection_is_rejected_without_network() {
        let transport = RecordingTransport::default();
        let notifier = RecordingNotifier::default();
        let coordinator = UploadCoordinator::new(transport.clone(), confirmer(true), notifier.clone());

        let mut collection = ImageCollection::new();
        let attempt = coordinator
            .attempt_upload(&mut collection, "folder", &valid_credentials())
            .await;

        assert_eq!(attempt, Attempt::Rejected(ValidationError::NoImages));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(*notifier.messages.lock().expect("lock"), vec!["no images selected"]);
    }

    #[tokio::test]
    async fn whitespace_folder_name_is_rejected_without_network() {
        let transport = RecordingTransport::default();
        let notifier = RecordingNotifier::default();
        let coordinator = UploadCoordinator::new(transport.clone(), confirmer(true), notifier.clone());

        let mut collection = images(&["a.png"]);
        let attempt = coordinator
            .attempt_upload(&mut collection, " \t ", &valid_credentials())
            .await;

        assert_eq!(attempt, Attempt::Rejected(ValidationError::MissingFolderName));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(collection.len(), 1);
        assert_eq!(*notifier.messages.lock().expect("lock"), vec!["folder name required"]);
    }

    #[tokio::test]
    async fn declined_confirmation_is_silent_and_side_effect_free() {
        let transport = RecordingTransport::default();
        let notifier = RecordingNotifier::default();
        let coordinator = UploadCoordinator::new(transport.clone(), confirmer(false), notifier.clone());

        let mut collection = images(&["a.png", "b.png"]);
        let before = collection.clone();
        let attempt = coordinator
            .attempt_upload(&mut collection, "folder", &valid_credentials())
            .await;

        assert_eq!(attempt, Attempt::Cancelled);
        assert_eq!(collection, before);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(notifier.messages.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn success_clears_collection_and_sends_trimmed_folder() {
        let transport = RecordingTransport {
            succeed: true,
            ..RecordingTransport::default()
        };
        let notifier = RecordingNotifier::default();
        let confirm = confirmer(true);
        let prompts = Arc::clone(&confirm.prompts);
        let coordinator = UploadCoordinator::new(transport.clone(), confirm, notifier.clone());

        let mut collection = images(&["A", "B", "C"]);
        let attempt = coordinator
            .attempt_upload(&mut collection, " shipment1 ", &valid_credentials())
            .await;

        assert!(attempt.succeeded());
        assert!(collection.is_empty());
        assert_eq!(*notifier.messages.lock().expect("lock"), vec!["upload succeeded"]);
        assert_eq!(
            *prompts.lock().expect("lock"),
            vec!["Upload 3 image(s) to folder \"shipment1\"?"]
        );

        let requests = transport.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].folder_name, "shipment1");
        assert_eq!(requests[0].images, images(&["A", "B", "C"]).snapshot());
    }

    #[tokio::test]
    async fn failure_keeps_collection_across_repeated_attempts() {
        let transport = RecordingTransport::default();
        let notifier = RecordingNotifier::default();
        let coordinator = UploadCoordinator::new(transport.clone(), confirmer(true), notifier.clone());

        let mut collection = images(&["A", "B"]);
        let before = collection.clone();

        for _ in 0..2 {
            let attempt = coordinator
                .attempt_upload(&mut collection, "x", &valid_credentials())
                .await;
            assert!(!attempt.succeeded());
        }

        assert_eq!(collection, before);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *notifier.messages.lock().expect("lock"),
            vec!["upload failed", "upload failed"]
        );
        assert!(!coordinator.is_uploading());
    }

    #[tokio::test]
    async fn panicking_transport_becomes_failed_outcome() {
        let notifier = RecordingNotifier::default();
        let coordinator = UploadCoordinator::new(PanickingTransport, confirmer(true), notifier.clone());

        let mut collection = images(&["A"]);
        let attempt = coordinator
            .attempt_upload(&mut collection, "x", &valid_credentials())
            .await;

        match attempt {
            Attempt::Finished(outcome) => {
                assert!(!outcome.succeeded);
                assert!(outcome.error_detail.is_some());
            }
            other => panic!("unexpected attempt: {:?}", other),
        }
        assert_eq!(collection.len(), 1);
        assert_eq!(*notifier.messages.lock().expect("lock"), vec!["upload failed"]);
    }

    struct GatedTransport {
        gate: Arc<tokio::sync::Notify>,
    }

    impl UploadTransport for GatedTransport {
        fn upload(&self, _request: UploadRequest) -> impl Future<Output = UploadOutcome> + Send {
            let gate = Arc::clone(&self.gate);
            async move {
                gate.notified().await;
                UploadOutcome::success(200, None)
            }
        }
    }

    #[tokio::test]
    async fn second_attempt_while_in_flight_is_rejected() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let notifier = RecordingNotifier::default();
        let coordinator = UploadCoordinator::new(
            GatedTransport { gate: Arc::clone(&gate) },
            confirmer(true),
            notifier.clone(),
        );

        let mut first = images(&["A"]);
        let mut second = images(&["B"]);
        let credentials = valid_credentials();

        let (first_attempt, second_attempt) = tokio::join!(
            coordinator.attempt_upload(&mut first, "x", &credentials),
            async {
                tokio::task::yield_now().await;
                let attempt = coordinator.attempt_upload(&mut second, "x", &credentials).await;
                gate.notify_one();
                attempt
            }
        );

        assert!(first_attempt.succeeded());
        assert_eq!(second_attempt, Attempt::Rejected(ValidationError::InFlight));
        assert!(first.is_empty());
        assert_eq!(second.len(), 1);
        assert_eq!(*notifier.messages.lock().expect("lock"), vec!["upload succeeded"]);
    }
}
