//! 统一错误类型模块
//!
//! # 设计思路
//!
//! `AppError` 只出现在应用边界（设置读写、终端交互、启动流程）。
//! 上传链路内部的失败由 `UploadError` 表达，并被折叠进 `UploadOutcome`，
//! 不会以 `Err` 的形式到达这里；`From<UploadError>` 仅用于启动阶段的配置校验。

use crate::upload::UploadError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 设置文件或配置目录不可用
    #[error("设置错误: {0}")]
    Settings(String),

    /// 文件系统 / 标准输入输出错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 上传组件初始化失败
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// 终端命令无法解析
    #[error("命令错误: {0}")]
    Console(String),
}
