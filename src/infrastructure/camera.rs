//! 摄像头 - 基础设施层
//!
//! 摄像头是稀缺资源：进入扫描界面时获取，离开时（包括出错）无条件释放。
//! `CameraSession` 是唯一的持有者，释放发生在 `Drop` 中。

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::models::CapturedImage;

/// 摄像头设备
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// 设备名称（用于日志和错误信息）
    fn name(&self) -> &str;

    /// 获取设备，返回的会话在 Drop 时释放设备
    async fn open(&self) -> Result<CameraSession, CaptureError>;
}

/// 帧来源，由具体设备实现
#[async_trait]
pub trait FrameSource: Send {
    /// 抓取一帧静态图像的原始字节
    async fn grab(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// 释放设备（停止采集）
    fn release(&mut self);
}

/// 已打开的摄像头会话
pub struct CameraSession {
    device: String,
    source: Box<dyn FrameSource>,
    frames: usize,
}

impl CameraSession {
    pub fn new(device: impl Into<String>, source: Box<dyn FrameSource>) -> Self {
        let device = device.into();
        info!("📷 摄像头已打开: {}", device);
        Self {
            device,
            source,
            frames: 0,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// 拍摄一帧静态图片
    pub async fn capture(&mut self) -> Result<CapturedImage, CaptureError> {
        let bytes = self.source.grab().await?;
        self.frames += 1;

        let label = format!(
            "camera-{}-{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            self.frames
        );
        let image = CapturedImage::from_bytes(bytes, label)?;
        debug!(
            "已拍摄 {} ({}, {} 字节)",
            image.label,
            image.mime_type,
            image.bytes.len()
        );
        Ok(image)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.source.release();
        info!("📷 摄像头已释放: {} (共拍摄 {} 帧)", self.device, self.frames);
    }
}

/// 通过外部命令拍照的摄像头
///
/// 命令需要把一帧图像写到 stdout，例如 `fswebcam --no-banner --jpeg 90 -`。
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    /// 从命令行参数列表创建，第一个元素为程序名
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl CameraDevice for CommandCamera {
    fn name(&self) -> &str {
        &self.program
    }

    async fn open(&self) -> Result<CameraSession, CaptureError> {
        let program = resolve_program(&self.program).ok_or_else(|| CaptureError::Device {
            device: self.program.clone(),
            reason: "找不到拍照命令".to_string(),
        })?;

        Ok(CameraSession::new(
            self.program.clone(),
            Box::new(CommandFrameSource {
                program,
                args: self.args.clone(),
            }),
        ))
    }
}

struct CommandFrameSource {
    program: PathBuf,
    args: Vec<String>,
}

#[async_trait]
impl FrameSource for CommandFrameSource {
    async fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
        let device = self.program.display().to_string();

        // kill_on_drop：调用方放弃等待时子进程随之结束
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::Device {
                device: device.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("拍照命令失败 ({}): {}", output.status, stderr.trim());
            return Err(CaptureError::Device {
                device,
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        if output.stdout.is_empty() {
            return Err(CaptureError::Device {
                device,
                reason: "拍照命令没有输出图像".to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// 每次拍照都是一次性命令，两帧之间不占用设备；
    /// 正在进行的拍照由 `kill_on_drop` 结束，这里没有需要关闭的句柄
    fn release(&mut self) {
        debug!("停止拍照命令: {}", self.program.display());
    }
}

/// 在 PATH 中查找程序
fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    struct FailingSource {
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FrameSource for FailingSource {
        async fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
            Err(CaptureError::Device {
                device: "test".to_string(),
                reason: "permission denied".to_string(),
            })
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_session_released_after_failed_capture() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let mut session = CameraSession::new(
                "test",
                Box::new(FailingSource {
                    released: released.clone(),
                }),
            );
            assert!(session.capture().await.is_err());
            assert_eq!(released.load(Ordering::SeqCst), 0);
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_program_is_device_error() {
        let camera =
            CommandCamera::from_command(&["no-such-camera-tool-xyz".to_string()]).unwrap();
        let err = camera.open().await.err().unwrap();
        assert!(matches!(err, CaptureError::Device { .. }));
    }

    #[tokio::test]
    async fn test_command_camera_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.png");
        std::fs::write(&frame, PNG_HEADER).unwrap();

        let camera = CommandCamera::from_command(&[
            "cat".to_string(),
            frame.display().to_string(),
        ])
        .unwrap();
        let mut session = camera.open().await.unwrap();
        let image = session.capture().await.unwrap();

        assert_eq!(image.mime_type, "image/png");
        assert!(image.label.starts_with("camera-"));
    }

    #[tokio::test]
    async fn test_command_camera_captures_repeatedly() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.png");
        std::fs::write(&frame, PNG_HEADER).unwrap();

        let camera = CommandCamera::from_command(&[
            "cat".to_string(),
            frame.display().to_string(),
        ])
        .unwrap();
        let mut session = camera.open().await.unwrap();
        let first = session.capture().await.unwrap();
        let second = session.capture().await.unwrap();

        assert!(first.label.ends_with("-1"));
        assert!(second.label.ends_with("-2"));
    }

    #[test]
    fn test_empty_command() {
        assert!(CommandCamera::from_command(&[]).is_none());
    }
}
