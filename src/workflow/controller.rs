//! 评分流程 - 流程层
//!
//! 核心职责：定义"答案键 → 分值 → 逐份评分"的完整流程
//!
//! 状态顺序：
//! 1. AwaitingKey：选择答案卷图片 → 分析答案键
//! 2. ConfiguringScores：修改分值 → 开始扫描
//! 3. ScanningStudents：逐份评分，结果追加到账本，直到重置

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, WorkflowError};
use crate::models::{AnswerKey, CapturedImage, GradedStudent, ScoreField};
use crate::services::{export_csv, Grader, KeyExtractor, VisionModel};
use crate::workflow::session::{Session, WorkflowState};

/// 评分流程控制器
///
/// - 独占 `Session`，所有状态变化都经过这里
/// - 同一时间最多一个模型调用（忙碌标志）
/// - 只依赖业务能力（services），不持有摄像头
pub struct WorkflowController {
    extractor: KeyExtractor,
    grader: Grader,
    session: Session,
    busy: Arc<AtomicBool>,
}

impl WorkflowController {
    /// 创建新的流程控制器
    pub fn new(model: Arc<dyn VisionModel>, config: &Config) -> Self {
        Self {
            extractor: KeyExtractor::new(model.clone()),
            grader: Grader::new(model, config),
            session: Session::new(config.default_scores),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> WorkflowState {
        self.session.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 忙碌标志的共享句柄，供进度提示并发读取
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        self.busy.clone()
    }

    /// 是否允许重置（第 1 步没有可清除的内容）
    pub fn can_reset(&self) -> bool {
        self.session.state != WorkflowState::AwaitingKey
    }

    // ========== 第 1 步：答案卷 ==========

    /// 选择答案卷图片（文件或拍照），替换之前的选择
    pub fn select_key_image(&mut self, image: CapturedImage) -> AppResult<()> {
        self.expect_state(WorkflowState::AwaitingKey)?;
        info!("✓ 已选择答案卷: {} ({})", image.label, image.mime_type);
        self.session.key_image = Some(image);
        Ok(())
    }

    /// 分析答案键
    ///
    /// 成功后进入分值设置；失败时停留在当前步骤，已选择的图片保留。
    pub async fn analyze_key(&mut self) -> AppResult<&AnswerKey> {
        self.session.last_error = None;
        if let Err(e) = self.expect_state(WorkflowState::AwaitingKey) {
            return self.fail("分析答案键失败", e);
        }

        let Some(image) = self.session.key_image.as_ref() else {
            return self.fail(
                "分析答案键失败",
                WorkflowError::MissingPrerequisite("答案卷图片").into(),
            );
        };

        let _busy = match BusyGuard::acquire(&self.busy) {
            Ok(guard) => guard,
            Err(e) => return self.fail("分析答案键失败", e.into()),
        };

        match self.extractor.extract(image).await {
            Ok(key) => {
                self.session.state = WorkflowState::ConfiguringScores;
                info!("➡️ 进入{}", self.session.state.step_title());
                let key: &AnswerKey = self.session.answer_key.insert(key);
                Ok(key)
            }
            Err(e) => self.fail("分析答案键失败，请确认图片清晰后重试", e),
        }
    }

    // ========== 第 2 步：分值 ==========

    /// 修改一个分值字段，后写入的值生效
    pub fn set_score(&mut self, field: ScoreField, raw: &str) -> AppResult<f64> {
        self.session.last_error = None;
        if let Err(e) = self.expect_state(WorkflowState::ConfiguringScores) {
            return self.fail("修改分值失败", e);
        }

        match field.coerce(raw) {
            Ok(value) => {
                self.session.scoring.set(field, value);
                info!("✓ {} 分值设为 {}", field.name(), value);
                Ok(value)
            }
            Err(e) => self.fail("修改分值失败", e.into()),
        }
    }

    /// 开始扫描学生答题卡，此后分值不再修改
    pub fn start_scanning(&mut self) -> AppResult<()> {
        self.session.last_error = None;
        if let Err(e) = self.expect_state(WorkflowState::ConfiguringScores) {
            return self.fail("开始扫描失败", e);
        }

        self.session.state = WorkflowState::ScanningStudents;
        info!(
            "➡️ 进入{} ({})",
            self.session.state.step_title(),
            self.session.scoring
        );
        Ok(())
    }

    // ========== 第 3 步：评分 ==========

    /// 给一份学生答题卡评分
    ///
    /// 没有答案键时在调用模型之前即拒绝；失败时不追加记录。
    pub async fn grade_student(&mut self, image: CapturedImage) -> AppResult<GradedStudent> {
        self.session.last_error = None;

        let Some(key) = self.session.answer_key.as_ref() else {
            return self.fail(
                "答案键不可用，请从头开始",
                WorkflowError::MissingPrerequisite("答案键").into(),
            );
        };

        if let Err(e) = self.expect_state(WorkflowState::ScanningStudents) {
            return self.fail("评分失败", e);
        }

        let _busy = match BusyGuard::acquire(&self.busy) {
            Ok(guard) => guard,
            Err(e) => return self.fail("评分失败", e.into()),
        };

        match self.grader.grade(&image, key, &self.session.scoring).await {
            Ok(scores) => {
                let record = self.session.ledger.append(scores, image.label);
                info!("✓ 学生 #{} 已记录，总分 {}", record.id, record.scores.total_score);
                Ok(record)
            }
            Err(e) => self.fail("评分失败，请重试", e),
        }
    }

    /// 已评分记录（按完成顺序）
    pub fn results(&self) -> &[GradedStudent] {
        self.session.ledger.list()
    }

    /// 导出成绩 CSV
    pub fn export_csv<W: Write>(&self, writer: W) -> AppResult<()> {
        export_csv(self.session.ledger.list(), writer)
    }

    // ========== 重置 ==========

    /// 清除图片、答案键、成绩和错误，回到第 1 步
    ///
    /// 分值配置保留，下一轮可直接沿用。
    pub fn reset(&mut self) -> AppResult<()> {
        if !self.can_reset() {
            return Err(WorkflowError::InvalidState {
                current: self.session.state.name(),
                expected: "ConfiguringScores 或 ScanningStudents",
            }
            .into());
        }

        let cleared = self.session.ledger.len();
        self.session.state = WorkflowState::AwaitingKey;
        self.session.key_image = None;
        self.session.answer_key = None;
        self.session.ledger.clear();
        self.session.last_error = None;
        self.busy.store(false, Ordering::Release);

        info!("🔄 已重置，清除 {} 条成绩", cleared);
        Ok(())
    }

    // ========== 辅助方法 ==========

    fn expect_state(&self, expected: WorkflowState) -> AppResult<()> {
        if self.session.state == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidState {
                current: self.session.state.name(),
                expected: expected.name(),
            }
            .into())
        }
    }

    /// 记录面向用户的错误信息并返回错误
    fn fail<T>(&mut self, action: &str, err: AppError) -> AppResult<T> {
        let message = format!("{}: {}", action, err);
        warn!("⚠️ {}", message);
        self.session.last_error = Some(message);
        Err(err)
    }
}

/// 忙碌标志守卫，任何退出路径都会清除标志
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, WorkflowError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkflowError::Busy)?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_guard_is_exclusive() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = BusyGuard::acquire(&flag).unwrap();
        assert!(flag.load(Ordering::Acquire));
        assert!(matches!(BusyGuard::acquire(&flag), Err(WorkflowError::Busy)));

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(BusyGuard::acquire(&flag).is_ok());
    }
}
