//! 采集到的静态图片

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;

use crate::error::CaptureError;

/// 一帧静态图片：字节 + MIME 类型
#[derive(Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// 文件名或 "camera-<时间戳>"，仅用于显示
    pub label: String,
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("label", &self.label)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl CapturedImage {
    /// 从原始字节创建，按文件头识别格式
    pub fn from_bytes(bytes: Vec<u8>, label: impl Into<String>) -> Result<Self, CaptureError> {
        Self::with_format_hint(bytes, label, None)
    }

    /// 文件头无法识别时，使用扩展名推断的格式
    pub fn with_format_hint(
        bytes: Vec<u8>,
        label: impl Into<String>,
        hint: Option<ImageFormat>,
    ) -> Result<Self, CaptureError> {
        let label = label.into();
        if bytes.is_empty() {
            return Err(CaptureError::Empty { label });
        }

        let format = match image::guess_format(&bytes) {
            Ok(format) => format,
            Err(_) => hint.ok_or_else(|| CaptureError::UnsupportedFormat {
                label: label.clone(),
            })?,
        };

        Ok(Self {
            bytes,
            mime_type: format.to_mime_type().to_string(),
            label,
        })
    }

    /// 编码为 data URL，作为图片内容发送给模型
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_sniff_png_and_jpeg() {
        let png = CapturedImage::from_bytes(PNG_HEADER.to_vec(), "key.png").unwrap();
        assert_eq!(png.mime_type, "image/png");

        let jpeg = CapturedImage::from_bytes(JPEG_HEADER.to_vec(), "frame").unwrap();
        assert_eq!(jpeg.mime_type, "image/jpeg");
    }

    #[test]
    fn test_reject_empty_and_unknown() {
        assert!(matches!(
            CapturedImage::from_bytes(Vec::new(), "empty.jpg"),
            Err(CaptureError::Empty { .. })
        ));
        assert!(matches!(
            CapturedImage::from_bytes(b"hello world".to_vec(), "notes.txt"),
            Err(CaptureError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_hint_used_when_header_unknown() {
        let img = CapturedImage::with_format_hint(
            b"not-a-real-header".to_vec(),
            "scan.webp",
            Some(ImageFormat::WebP),
        )
        .unwrap();
        assert_eq!(img.mime_type, "image/webp");
    }

    #[test]
    fn test_data_url() {
        let img = CapturedImage::from_bytes(PNG_HEADER.to_vec(), "key.png").unwrap();
        let url = img.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.ends_with(&STANDARD.encode(PNG_HEADER)));
    }
}
