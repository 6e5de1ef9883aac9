//! # multipart 请求体构建模块
//!
//! ## 设计思路
//!
//! 在发出任何网络请求之前完成整批文件的预检，任意一张不合格即整体失败，
//! 保证“整批原子”语义：要么整个 multipart POST 往返成功，要么根本不发出。
//!
//! ## 实现思路
//!
//! 1. 逐张读取 metadata：存在性、普通文件、体积上限
//! 2. 读取文件头部做签名探测（`infer`），得到分片 MIME
//! 3. 以 `tokio::fs::File` 作为流式 Body 挂到 `photos` 字段，不整体读入内存
//! 4. `folder_name` 作为文本字段写在最前面

use reqwest::multipart::{Form, Part};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::collection::ImageRef;

use super::{UploadConfig, UploadError};

pub const FOLDER_NAME_FIELD: &str = "folder_name";
pub const PHOTOS_FIELD: &str = "photos";

const SIGNATURE_PROBE_BYTES: usize = 8192;
const FALLBACK_MIME: &str = "application/octet-stream";

/// 预检通过的单张图片。
#[derive(Debug)]
pub(crate) struct PreparedImage {
    pub(crate) image: ImageRef,
    pub(crate) len: u64,
    pub(crate) mime: &'static str,
}

/// 已构建好的请求体及其统计信息。
pub(crate) struct PreparedForm {
    pub(crate) form: Form,
    pub(crate) part_count: usize,
    pub(crate) total_bytes: u64,
}

/// 读取单张图片的 metadata 与签名。
pub(crate) async fn inspect_image(
    image: &ImageRef,
    config: &UploadConfig,
) -> Result<PreparedImage, UploadError> {
    let path = image.path();

    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        UploadError::FileSystem(format!("无法读取文件信息：{}（{}）", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(UploadError::FileSystem(format!("不是普通文件：{}", path.display())));
    }

    if metadata.len() > config.max_file_size {
        return Err(UploadError::ResourceLimit(format!(
            "文件过大：{}，{:.2} MB（限制：{:.2} MB）",
            path.display(),
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let probe = read_probe(image).await?;
    let kind = infer::get(&probe);

    if config.verify_image_signature {
        match kind {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {}
            Some(kind) => {
                return Err(UploadError::InvalidFormat(format!(
                    "文件签名不是图片类型：{}（{}）",
                    path.display(),
                    kind.mime_type()
                )));
            }
            None => {
                return Err(UploadError::InvalidFormat(format!(
                    "无法识别图片类型：{}",
                    path.display()
                )));
            }
        }
    }

    Ok(PreparedImage {
        image: image.clone(),
        len: metadata.len(),
        mime: kind.map(|k| k.mime_type()).unwrap_or(FALLBACK_MIME),
    })
}

async fn read_probe(image: &ImageRef) -> Result<Vec<u8>, UploadError> {
    let mut file = File::open(image.path()).await.map_err(|e| {
        UploadError::FileSystem(format!("无法打开图片文件：{}（{}）", image.path().display(), e))
    })?;

    let mut probe = vec![0u8; SIGNATURE_PROBE_BYTES];
    let mut filled = 0;
    while filled < probe.len() {
        let read = file.read(&mut probe[filled..]).await.map_err(|e| {
            UploadError::FileSystem(format!("无法读取图片文件：{}（{}）", image.path().display(), e))
        })?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    probe.truncate(filled);

    Ok(probe)
}

/// 构建整批 multipart 请求体。
pub(crate) async fn build_form(
    images: &[ImageRef],
    folder_name: &str,
    config: &UploadConfig,
) -> Result<PreparedForm, UploadError> {
    let mut prepared = Vec::with_capacity(images.len());
    for image in images {
        prepared.push(inspect_image(image, config).await?);
    }

    let total_bytes = prepared.iter().map(|p| p.len).sum();
    let part_count = prepared.len();

    let mut form = Form::new().text(FOLDER_NAME_FIELD, folder_name.to_string());
    for item in prepared {
        let file = File::open(item.image.path()).await.map_err(|e| {
            UploadError::FileSystem(format!(
                "无法打开图片文件：{}（{}）",
                item.image.path().display(),
                e
            ))
        })?;

        let part = Part::stream_with_length(reqwest::Body::from(file), item.len)
            .file_name(item.image.file_name())
            .mime_str(item.mime)
            .map_err(|e| UploadError::InvalidFormat(format!("无效的 MIME 类型：{}", e)))?;

        form = form.part(PHOTOS_FIELD, part);
    }

    Ok(PreparedForm {
        form,
        part_count,
        total_bytes,
    })
}
