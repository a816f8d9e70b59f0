use std::path::{Path, PathBuf};

use image::ImageFormat;
use tokio::fs;

use crate::error::CaptureError;
use crate::models::CapturedImage;

/// 从文件加载图片（相当于文件选择器）
pub async fn load_image_file(path: &Path) -> Result<CapturedImage, CaptureError> {
    let bytes = fs::read(path)
        .await
        .map_err(|source| CaptureError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let image = CapturedImage::with_format_hint(bytes, label, ImageFormat::from_path(path).ok())?;
    tracing::debug!(
        "已加载图片 {} ({}, {} 字节)",
        image.label,
        image.mime_type,
        image.bytes.len()
    );
    Ok(image)
}

/// 列出文件夹中的图片文件，按文件名排序
pub async fn list_image_files(folder: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    let read_failed = |source| CaptureError::ReadFailed {
        path: folder.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    let mut entries = fs::read_dir(folder).await.map_err(read_failed)?;

    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        let path = entry.path();
        if path.is_file() && ImageFormat::from_path(&path).is_ok() {
            files.push(path);
        } else {
            tracing::debug!("跳过非图片文件: {}", path.display());
        }
    }

    files.sort();
    Ok(files)
}
