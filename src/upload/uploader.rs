//! # 上传执行模块
//!
//! ## 设计思路
//!
//! `Uploader` 每次调用只发出一次 HTTP POST，内部不做任何重试。
//! 所有失败路径都折叠为 `UploadOutcome { succeeded: false, .. }`，绝不向调用方抛错。
//!
//! ## 实现思路
//!
//! - 凭据缺失：直接返回 `not configured`，不发请求。
//! - 请求体：见 `form.rs`，整批预检后流式挂载。
//! - 认证：`Authorization: Bearer {apiKey}`。
//! - 状态码：由 `StatusPolicy` 决定非 2xx 是否算失败。
//! - 超时：连接超时来自 `UploadConfig`；请求总超时按整批体积由 `UploadConfig::timeout_for` 计算，逐请求设置。
//! - reqwest 错误统一映射到 `UploadError`，日志中的 URL 会去掉 query/fragment。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::collection::ImageRef;
use crate::settings::Credentials;

use super::form::build_form;
use super::{UploadConfig, UploadError, UploadOutcome};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// 一次上传调用的全部输入（拥有所有权，可跨任务移动）。
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub images: Vec<ImageRef>,
    pub folder_name: String,
    pub credentials: Credentials,
}

/// Coordinator 与网络层之间的接缝。
pub trait UploadTransport: Send + Sync {
    fn upload(&self, request: UploadRequest) -> impl Future<Output = UploadOutcome> + Send;
}

/// 基于 reqwest 的批量上传器。
#[derive(Clone)]
pub struct Uploader {
    client: reqwest::Client,
    config: Arc<UploadConfig>,
}

impl Uploader {
    /// 根据配置创建上传器，同时构建复用型 HTTP 客户端。
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let client = Self::build_http_client(&config)?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// 执行一次整批上传。
    pub async fn upload_batch(
        &self,
        images: &[ImageRef],
        folder_name: &str,
        credentials: &Credentials,
    ) -> UploadOutcome {
        let start = Instant::now();

        match self.try_upload(images, folder_name, credentials).await {
            Ok((status, body)) => {
                log::info!(
                    "✅ 上传完成 - 状态: {} 图片数: {} 耗时: {}ms",
                    status,
                    images.len(),
                    start.elapsed().as_millis()
                );
                UploadOutcome::success(status, body)
            }
            Err(err) => {
                log::warn!(
                    "❌ 上传失败 - code={} stage={} 耗时: {}ms: {}",
                    err.code(),
                    err.stage(),
                    start.elapsed().as_millis(),
                    err
                );
                UploadOutcome::failure(err)
            }
        }
    }

    async fn try_upload(
        &self,
        images: &[ImageRef],
        folder_name: &str,
        credentials: &Credentials,
    ) -> Result<(u16, Option<String>), UploadError> {
        let (api_key, endpoint) = credentials.pair().ok_or(UploadError::NotConfigured)?;
        let url = Self::parse_endpoint(endpoint)?;
        let redacted = Self::redact_url_for_log(url.as_str());

        let prepared = build_form(images, folder_name, &self.config).await?;
        let timeout = self.config.timeout_for(prepared.total_bytes);
        log::info!(
            "📤 开始上传 - 目标: {} 文件夹: {} 分片: {} 总大小: {:.2} MB 超时: {}s",
            redacted,
            folder_name,
            prepared.part_count,
            prepared.total_bytes as f64 / 1024.0 / 1024.0,
            timeout.as_secs()
        );

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(api_key)
            .timeout(timeout)
            .multipart(prepared.form)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e, url.as_str(), timeout))?;

        let status = response.status();
        log::debug!("📡 收到响应 - 状态: {} 目标: {}", status, redacted);
        let body = self.read_body_for_diagnostics(response).await;

        if !self.config.status_policy.accepts(status) {
            return Err(UploadError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok((status.as_u16(), body))
    }

    fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url, UploadError> {
        let url = reqwest::Url::parse(endpoint.trim())
            .map_err(|e| UploadError::InvalidFormat(format!("API 地址格式错误：{}", e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(UploadError::InvalidFormat(format!(
                "API 地址协议不受支持：{}（仅支持 http / https）",
                other
            ))),
        }
    }

    /// 读取响应体（截断到配置上限），仅用于诊断；读取失败时返回已读部分。
    async fn read_body_for_diagnostics(&self, mut response: reqwest::Response) -> Option<String> {
        let limit = self.config.max_response_body_bytes;
        let mut buffer: Vec<u8> = Vec::new();

        while buffer.len() < limit {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let remaining = limit - buffer.len();
                    buffer.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
                }
                Ok(None) => break,
                Err(err) => {
                    log::debug!("⚠️ 读取响应体失败: {}", err);
                    break;
                }
            }
        }

        if buffer.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&buffer).into_owned())
        }
    }

    fn build_http_client(config: &UploadConfig) -> Result<reqwest::Client, UploadError> {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UploadError::Network(format!("无法创建 HTTP 客户端：{}", e)))
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(&self, e: reqwest::Error, url: &str, timeout: Duration) -> UploadError {
        let err_msg = Self::sanitize_error_message_with_redacted_url(&Self::error_chain(&e), url);

        if e.is_timeout() {
            UploadError::Timeout(format!("上传超时（{}秒）：{}", timeout.as_secs(), err_msg))
        } else if e.is_connect() {
            UploadError::Network(format!("无法连接：{}", err_msg))
        } else {
            UploadError::Network(format!("请求失败：{}", err_msg))
        }
    }

    fn error_chain(error: &reqwest::Error) -> String {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = std::error::Error::source(inner);
        }
        message
    }

    fn sanitize_error_message_with_redacted_url(error_msg: &str, url: &str) -> String {
        let redacted = Self::redact_url_for_log(url);
        error_msg.replace(url, &redacted)
    }

    /// 去掉 URL 中的用户信息、query 与 fragment。
    pub(crate) fn redact_url_for_log(url: &str) -> String {
        let Ok(mut parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        parsed.set_query(None);
        parsed.set_fragment(None);
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
        parsed.to_string()
    }
}

impl UploadTransport for Uploader {
    fn upload(&self, request: UploadRequest) -> impl Future<Output = UploadOutcome> + Send {
        async move {
            self.upload_batch(&request.images, &request.folder_name, &request.credentials)
                .await
        }
    }
}
