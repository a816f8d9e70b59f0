//! 应用入口 - 编排层
//!
//! 持有配置和模型客户端，负责交互模式和批量模式的启动

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{CameraDevice, CommandCamera};
use crate::models::{list_image_files, load_image_file, ScoringConfig};
use crate::orchestrator::batch_grader::BatchGrader;
use crate::orchestrator::shell::Shell;
use crate::services::{
    default_export_path, write_csv_file, Grader, KeyExtractor, LlmService, VisionModel,
};
use crate::utils::logging::{log_batch_start, log_startup, print_final_stats};
use crate::workflow::WorkflowController;

/// 应用主结构
pub struct App {
    config: Config,
    model: Arc<dyn VisionModel>,
}

impl App {
    /// 使用 OpenAI 兼容的模型客户端初始化应用
    pub fn initialize(config: Config) -> Self {
        let model: Arc<dyn VisionModel> = Arc::new(LlmService::new(&config));
        Self::with_model(config, model)
    }

    /// 使用指定的模型初始化应用
    pub fn with_model(config: Config, model: Arc<dyn VisionModel>) -> Self {
        Self { config, model }
    }

    /// 交互模式
    pub async fn run_interactive(&self) -> Result<()> {
        log_startup(&self.config, "交互评分模式");

        let camera = self
            .config
            .camera_command
            .as_deref()
            .and_then(CommandCamera::from_command)
            .map(|camera| Arc::new(camera) as Arc<dyn CameraDevice>);
        if camera.is_none() {
            info!("💡 未配置拍照命令，只能使用图片文件");
        }

        let controller = WorkflowController::new(self.model.clone(), &self.config);
        Shell::new(controller, camera).run().await
    }

    /// 批量模式：提取答案键后并发评分文件夹中的所有答题卡
    ///
    /// 返回导出的 CSV 路径
    pub async fn run_batch(
        &self,
        key_path: &Path,
        students_dir: &Path,
        output: Option<PathBuf>,
        scoring: ScoringConfig,
    ) -> Result<PathBuf> {
        log_startup(&self.config, "批量评分模式");

        let key_image = load_image_file(key_path)
            .await
            .with_context(|| format!("无法加载答案卷: {}", key_path.display()))?;
        let key = KeyExtractor::new(self.model.clone())
            .extract(&key_image)
            .await
            .context("分析答案键失败")?;
        info!("📊 分值: {}", scoring);

        let sheets = list_image_files(students_dir)
            .await
            .with_context(|| format!("无法读取答题卡文件夹: {}", students_dir.display()))?;
        if sheets.is_empty() {
            warn!("⚠️ 文件夹 {} 中没有答题卡图片", students_dir.display());
        }
        log_batch_start(sheets.len(), self.config.max_concurrent_gradings);

        let grader = Arc::new(Grader::new(self.model.clone(), &self.config));
        let outcome = BatchGrader::new(grader, self.config.max_concurrent_gradings)
            .grade_all(Arc::new(key), scoring, sheets)
            .await?;

        let output = output.unwrap_or_else(default_export_path);
        write_csv_file(outcome.ledger.list(), &output)?;

        for (label, reason) in &outcome.failures {
            warn!("未评分: {} ({})", label, reason);
        }
        print_final_stats(
            outcome.success,
            outcome.failed(),
            outcome.total(),
            &output.display().to_string(),
        );

        Ok(output)
    }
}
