//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `UploadConfig`，保证运行时行为可观测、可调整、可测试。
//! 配置随 `settings.json` 中的 `upload` 对象持久化，缺失字段回退到默认值。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `StatusPolicy` 决定非 2xx 响应是否算作失败。
//! - `validate` 在构建 Uploader 前拒绝明显无效的参数。
//! - 请求超时随整批体积放大：`request_timeout_secs` 只是基础预算，
//!   每个请求实际超时为基础预算加上按 `min_upload_bytes_per_sec` 计算的发送时间。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::UploadError;

/// 响应状态码判定策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// 只有 2xx 视为成功。
    #[default]
    RequireSuccess,
    /// 收到任意响应即视为成功（早期版本行为）。
    AnyResponse,
}

impl StatusPolicy {
    pub(crate) fn accepts(self, status: reqwest::StatusCode) -> bool {
        match self {
            Self::RequireSuccess => status.is_success(),
            Self::AnyResponse => true,
        }
    }
}

/// 上传配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 单次上传请求的基础超时（秒），包含请求体发送与响应读取。
    /// 实际超时见 [`UploadConfig::timeout_for`]。
    pub request_timeout_secs: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout_secs: u64,
    pub status_policy: StatusPolicy,
    /// 单张图片允许的最大体积（字节）。
    /// 整批没有总量上限，大批量上传的耗时由 `min_upload_bytes_per_sec` 兜底。
    pub max_file_size: u64,
    /// 预期最低上行速率（字节/秒），用于放大整批请求的超时。
    pub min_upload_bytes_per_sec: u64,
    /// 是否通过文件签名（magic bytes）确认每个文件都是图片。
    pub verify_image_signature: bool,
    /// 为诊断保留的响应体最大字节数。
    pub max_response_body_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            status_policy: StatusPolicy::RequireSuccess,
            max_file_size: 50 * 1024 * 1024,
            min_upload_bytes_per_sec: 64 * 1024,
            verify_image_signature: true,
            max_response_body_bytes: 64 * 1024,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.request_timeout_secs == 0 {
            return Err(UploadError::InvalidFormat("request_timeout_secs 必须大于 0".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(UploadError::InvalidFormat("connect_timeout_secs 必须大于 0".to_string()));
        }
        if self.connect_timeout_secs > self.request_timeout_secs {
            return Err(UploadError::InvalidFormat(
                "connect_timeout_secs 不能大于 request_timeout_secs".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(UploadError::InvalidFormat("max_file_size 必须大于 0".to_string()));
        }
        if self.min_upload_bytes_per_sec == 0 {
            return Err(UploadError::InvalidFormat(
                "min_upload_bytes_per_sec 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 发送 `total_bytes` 字节请求体时允许的整体超时。
    pub fn timeout_for(&self, total_bytes: u64) -> Duration {
        let rate = self.min_upload_bytes_per_sec.max(1);
        let transfer_secs = total_bytes.div_ceil(rate);
        Duration::from_secs(self.request_timeout_secs.saturating_add(transfer_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_strict() {
        let config = UploadConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.status_policy, StatusPolicy::RequireSuccess);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: UploadConfig =
            serde_json::from_str(r#"{"status_policy":"any_response","request_timeout_secs":30}"#)
                .expect("parse partial config");

        assert_eq!(config.status_policy, StatusPolicy::AnyResponse);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, UploadConfig::default().connect_timeout_secs);
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = UploadConfig::default();
        config.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(UploadError::InvalidFormat(_))));

        let mut config = UploadConfig::default();
        config.connect_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(UploadError::InvalidFormat(_))));
    }

    #[test]
    fn status_policy_classification() {
        use reqwest::StatusCode;

        assert!(StatusPolicy::RequireSuccess.accepts(StatusCode::OK));
        assert!(StatusPolicy::RequireSuccess.accepts(StatusCode::CREATED));
        assert!(!StatusPolicy::RequireSuccess.accepts(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!StatusPolicy::RequireSuccess.accepts(StatusCode::UNAUTHORIZED));
        assert!(StatusPolicy::AnyResponse.accepts(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn timeout_grows_with_batch_size() {
        let config = UploadConfig::default();
        assert_eq!(config.timeout_for(0), Duration::from_secs(120));
        assert_eq!(config.timeout_for(1), Duration::from_secs(121));

        // 十张 50 MiB 图片按 64 KiB/s 计算需要 8000 秒。
        let batch = 10 * config.max_file_size;
        assert_eq!(config.timeout_for(batch), Duration::from_secs(120 + 8000));
    }

    #[test]
    fn validate_rejects_zero_upload_rate() {
        let config = UploadConfig {
            min_upload_bytes_per_sec: 0,
            ..UploadConfig::default()
        };
        assert!(matches!(config.validate(), Err(UploadError::InvalidFormat(_))));
    }
}
