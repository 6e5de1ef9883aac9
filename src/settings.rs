//! 凭据与设置存储模块
//!
//! # 设计思路
//!
//! API Key 与 API 地址由外部设置流程写入 `settings.json`，核心上传链路只读。
//! `CredentialStore` 抽象“加载凭据”这一能力，启动时与设置流程返回后各调用一次。
//!
//! # 实现思路
//!
//! - 文件不存在或内容损坏时回退为“未配置”，不向上抛错。
//! - 空字符串 / 纯空白视为未设置。
//! - 写入时保留文件中的其它键（例如 `upload` 配置对象）。

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::upload::UploadConfig;

pub const API_KEY_KEY: &str = "apiKey";
pub const API_ENDPOINT_KEY: &str = "apiEndpoint";
pub const UPLOAD_CONFIG_KEY: &str = "upload";
pub const SETTINGS_PATH_ENV: &str = "BATCH_UPLOADER_SETTINGS";

/// 上传所需凭据。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_endpoint: impl Into<String>) -> Self {
        Self {
            api_key: non_blank(Some(api_key.into())),
            api_endpoint: non_blank(Some(api_endpoint.into())),
        }
    }

    /// 两个字段同时存在时返回去除首尾空白的 `(api_key, api_endpoint)`。
    pub fn pair(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let endpoint = self
            .api_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())?;
        Some((key, endpoint))
    }

    pub fn is_configured(&self) -> bool {
        self.pair().is_some()
    }
}

/// API Key 不进入日志。
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}

/// 凭据来源。
pub trait CredentialStore {
    /// 加载凭据；未设置的字段为 `None`。
    fn load(&self) -> Credentials;
}

/// 基于 JSON 文件的设置存储。
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 优先使用环境变量 `BATCH_UPLOADER_SETTINGS`，否则为系统配置目录下的
    /// `batch-uploader/settings.json`。
    pub fn default_location() -> Result<Self, AppError> {
        if let Ok(custom) = std::env::var(SETTINGS_PATH_ENV) {
            if !custom.trim().is_empty() {
                return Ok(Self::new(custom));
            }
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::Settings("无法确定系统配置目录".to_string()))?;
        Ok(Self::new(config_dir.join("batch-uploader").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 上传配置；缺失或解析失败时回退默认值。
    pub fn load_upload_config(&self) -> UploadConfig {
        let Some(value) = read_settings_object(&self.path).remove(UPLOAD_CONFIG_KEY) else {
            return UploadConfig::default();
        };

        match serde_json::from_value(value) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("⚠️ 上传配置解析失败，使用默认配置: {err}");
                UploadConfig::default()
            }
        }
    }

    /// 写入凭据，`None` 字段会从文件中移除。
    pub fn save_credentials(&self, credentials: &Credentials) -> Result<(), AppError> {
        let mut settings = read_settings_object(&self.path);

        for (key, value) in [
            (API_KEY_KEY, &credentials.api_key),
            (API_ENDPOINT_KEY, &credentials.api_endpoint),
        ] {
            match non_blank(value.clone()) {
                Some(v) => {
                    settings.insert(key.to_string(), Value::String(v));
                }
                None => {
                    settings.remove(key);
                }
            }
        }

        write_settings_object(&self.path, settings)
    }
}

impl CredentialStore for JsonSettingsStore {
    fn load(&self) -> Credentials {
        let settings = read_settings_object(&self.path);
        let field = |key: &str| non_blank(settings.get(key).and_then(Value::as_str).map(str::to_string));

        Credentials {
            api_key: field(API_KEY_KEY),
            api_endpoint: field(API_ENDPOINT_KEY),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_settings_object(path: &Path) -> Map<String, Value> {
    if path.exists() {
        if let Ok(content) = fs::read_to_string(path) {
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => return map,
                Ok(_) => log::warn!("⚠️ 设置文件不是 JSON 对象，按空设置处理: {}", path.display()),
                Err(err) => log::warn!("⚠️ 设置文件解析失败，按空设置处理: {err}"),
            }
        }
    }
    Map::new()
}

fn write_settings_object(path: &Path, settings: Map<String, Value>) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
        }
    }

    let content = serde_json::to_string_pretty(&Value::Object(settings))
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}
