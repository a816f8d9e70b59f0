//! 会话上下文
//!
//! 封装"当前流程走到哪一步、已有哪些数据"这一信息，由 `WorkflowController` 独占

use std::fmt::Display;

use crate::models::{AnswerKey, CapturedImage, ScoringConfig};
use crate::services::ResultsLedger;

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// 第 1 步：提供答案卷
    AwaitingKey,
    /// 第 2 步：设置分值
    ConfiguringScores,
    /// 第 3 步：扫描并评分学生答题卡
    ScanningStudents,
}

impl WorkflowState {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            WorkflowState::AwaitingKey => "AwaitingKey",
            WorkflowState::ConfiguringScores => "ConfiguringScores",
            WorkflowState::ScanningStudents => "ScanningStudents",
        }
    }

    /// 面向用户的步骤说明
    pub fn step_title(self) -> &'static str {
        match self {
            WorkflowState::AwaitingKey => "第 1 步：提供答案卷",
            WorkflowState::ConfiguringScores => "第 2 步：设置分值",
            WorkflowState::ScanningStudents => "第 3 步：扫描并评分",
        }
    }
}

impl Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 会话
///
/// 启动或重置时创建
#[derive(Debug)]
pub struct Session {
    pub(crate) state: WorkflowState,
    pub(crate) key_image: Option<CapturedImage>,
    pub(crate) answer_key: Option<AnswerKey>,
    pub(crate) scoring: ScoringConfig,
    pub(crate) ledger: ResultsLedger,
    pub(crate) last_error: Option<String>,
}

impl Session {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self {
            state: WorkflowState::AwaitingKey,
            key_image: None,
            answer_key: None,
            scoring,
            ledger: ResultsLedger::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn key_image(&self) -> Option<&CapturedImage> {
        self.key_image.as_ref()
    }

    pub fn answer_key(&self) -> Option<&AnswerKey> {
        self.answer_key.as_ref()
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn ledger(&self) -> &ResultsLedger {
        &self.ledger
    }

    /// 最近一次面向用户的错误信息
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
