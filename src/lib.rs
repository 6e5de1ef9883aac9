//! # 批量图片上传工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 界面（终端 / 其他前端）                    │
//! │                                                          │
//! │  ImagePicker ── Confirmer ── Notifier ── 设置流程         │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                            │
//! │                                                          │
//! │  ┌─ collection ── ImageRef / ImageCollection             │
//! │  ├─ settings ──── Credentials + settings.json            │
//! │  ├─ upload                                               │
//! │  │   ├─ coordinator  校验 · 确认 · 集合回写               │
//! │  │   ├─ uploader     单次 multipart POST (reqwest)        │
//! │  │   └─ form         预检 + 流式分片                      │
//! │  ├─ console ───── 终端协作者实现                          │
//! │  └─ error ─────── AppError                               │
//! └──────────────────────────────────────────────────────────┘
//!         ↕ HTTP POST multipart/form-data + Bearer
//!    远端上传服务
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 应用边界错误类型 `AppError` |
//! | [`collection`] | 待上传图片集合与选择器接口 |
//! | [`settings`] | 凭据加载 / 保存，上传配置读取 |
//! | [`upload`] | 上传编排、multipart 构建与网络调用 |
//! | [`console`] | 终端前端：命令解析、确认、提示 |

pub mod collection;
pub mod console;
pub mod error;
pub mod settings;
pub mod upload;
