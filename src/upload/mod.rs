//! # 上传模块（upload）
//!
//! ## 设计思路
//!
//! 将“前置校验 → 用户确认 → 构建 multipart → 发送请求 → 结果回写集合”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `coordinator`：编排一次上传尝试（校验、确认、并发保护、集合回写、提示）
//! - `uploader`：执行单次 HTTP POST，映射结果为 `UploadOutcome`
//! - `form`：整批文件预检与流式 multipart 构建
//! - `config/error/outcome`：配置、错误、结果模型
//!
//! ## 调用链
//!
//! ```text
//! 界面事件
//!    ↓
//! coordinator.rs（校验 + 确认 + in-flight 保护）
//!    ↓  tokio::spawn
//! uploader.rs（凭据检查 + 发送 + 状态码判定）
//!    ├─ form.rs（预检 + 流式分片）
//!    ↓
//! UploadOutcome → 成功清空集合 / 失败保持原样 → Notifier
//! ```

mod config;
mod coordinator;
mod error;
mod form;
mod outcome;
mod uploader;

pub use config::{StatusPolicy, UploadConfig};
pub use coordinator::{
    confirmation_message, Attempt, Confirmer, Notifier, UploadCoordinator,
    UPLOAD_FAILED_MESSAGE, UPLOAD_SUCCEEDED_MESSAGE,
};
pub use error::{UploadError, ValidationError};
pub use form::{FOLDER_NAME_FIELD, PHOTOS_FIELD};
pub use outcome::UploadOutcome;
pub use uploader::{UploadRequest, UploadTransport, Uploader};
