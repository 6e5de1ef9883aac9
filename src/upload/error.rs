//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 上传链路中的所有失败来源统一收敛到 `UploadError`，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时提供稳定的 `code()` / `stage()`
//! 供日志与诊断使用。
//!
//! 注意：`UploadError` 不会跨越 Uploader → Coordinator 边界以 `Err` 形式传播，
//! Uploader 会将其折叠进 `UploadOutcome::error_detail`。

/// 发起上传前的输入校验失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no images selected")]
    NoImages,

    #[error("folder name required")]
    MissingFolderName,

    /// 已有一次上传尚未结束。
    #[error("upload already in progress")]
    InFlight,
}

/// 上传链路统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// 缺少 API Key 或 API 地址。
    #[error("not configured")]
    NotConfigured,

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    /// 服务端返回非 2xx 状态（仅在 `StatusPolicy::RequireSuccess` 下产生）。
    #[error("服务器返回错误状态：{status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// 上传任务异常终止（panic / abort）。
    #[error("上传任务异常终止：{0}")]
    TaskFailed(String),
}

impl UploadError {
    /// 稳定错误码，便于日志检索。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::NoImages) => "E_NO_IMAGES",
            Self::Validation(ValidationError::MissingFolderName) => "E_NO_FOLDER_NAME",
            Self::Validation(ValidationError::InFlight) => "E_IN_FLIGHT",
            Self::NotConfigured => "E_NOT_CONFIGURED",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::Network(_) => "E_NETWORK",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::HttpStatus { .. } => "E_HTTP_STATUS",
            Self::TaskFailed(_) => "E_TASK_FAILED",
        }
    }

    /// 出错所在阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::NotConfigured => "validate",
            Self::FileSystem(_) | Self::ResourceLimit(_) | Self::InvalidFormat(_) => "prepare",
            Self::Network(_) | Self::Timeout(_) | Self::TaskFailed(_) => "send",
            Self::HttpStatus { .. } => "response",
        }
    }
}
