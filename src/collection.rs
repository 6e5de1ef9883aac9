//! # 图片集合模块
//!
//! ## 设计思路
//!
//! 将“待上传图片列表”从界面生命周期中抽离为显式状态容器 `ImageCollection`，
//! 测试可以直接构造，不依赖任何渲染层。
//!
//! - `ImageRef`：本地图片的不可变句柄（文件路径）
//! - `ImageCollection`：有序、允许重复，插入顺序即展示与上传顺序
//! - `ImagePicker`：图库多选 / 相机拍摄的外部协作者接口
//!
//! 集合只会在以下时机变化：选图追加、按下标删除、整批上传成功后清空。

use std::path::{Path, PathBuf};

/// 本地图片句柄。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    path: PathBuf,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// multipart 分片使用的文件名；路径没有文件名部分时回退为 `image`。
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "image".to_string())
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// 待上传图片集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCollection {
    items: Vec<ImageRef>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加多选结果（可能为空，例如用户取消选择）。
    pub fn append(&mut self, picked: Vec<ImageRef>) {
        self.items.extend(picked);
    }

    pub fn push(&mut self, image: ImageRef) {
        self.items.push(image);
    }

    /// 按下标删除；越界时不做任何修改并返回 `None`。
    pub fn remove(&mut self, index: usize) -> Option<ImageRef> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[ImageRef] {
        &self.items
    }

    /// 当前集合的拷贝，作为一次上传请求的输入。
    pub fn snapshot(&self) -> Vec<ImageRef> {
        self.items.clone()
    }
}

impl FromIterator<ImageRef> for ImageCollection {
    fn from_iter<I: IntoIterator<Item = ImageRef>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// 图片来源（图库 / 相机）。
pub trait ImagePicker {
    /// 多选；用户取消时返回空列表。
    fn pick_multiple(&self) -> Vec<ImageRef>;

    /// 拍摄一张；用户取消时返回 `None`。
    fn capture_one(&self) -> Option<ImageRef>;
}

/// 基于本地路径列表的选择器。
///
/// 不存在或不是普通文件的路径会被跳过。
pub struct FsPicker {
    candidates: Vec<PathBuf>,
}

impl FsPicker {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: paths.into_iter().map(Into::into).collect(),
        }
    }

    fn resolve(path: &Path) -> Option<ImageRef> {
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => Some(ImageRef::new(path)),
            Ok(_) => {
                log::warn!("⚠️ 跳过非普通文件: {}", path.display());
                None
            }
            Err(err) => {
                log::warn!("⚠️ 跳过无法访问的路径: {} ({})", path.display(), err);
                None
            }
        }
    }
}

impl ImagePicker for FsPicker {
    fn pick_multiple(&self) -> Vec<ImageRef> {
        self.candidates
            .iter()
            .filter_map(|path| Self::resolve(path))
            .collect()
    }

    fn capture_one(&self) -> Option<ImageRef> {
        self.candidates.iter().find_map(|path| Self::resolve(path))
    }
}
