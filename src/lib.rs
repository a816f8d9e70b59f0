//! # Answer Sheet Grader
//!
//! 用视觉大模型批改纸质答题卡：先从答案卷提取答案键，设置分值，再逐份评分学生答题卡，
//! 成绩追加到账本并可导出 CSV。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（摄像头），只暴露拍照能力
//! - `CameraSession` - 摄像头的唯一持有者，Drop 时释放设备
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每次只处理一张图片
//! - `KeyExtractor` - 从答案卷提取答案键
//! - `Grader` - 按答案键和分值给答题卡评分
//! - `ResultsLedger` - 只追加的成绩账本
//! - `csv_export` - 成绩导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"答案键 → 分值 → 逐份评分"的三步流程
//! - `Session` - 会话状态（步骤、答案键、分值、账本、最近错误）
//! - `WorkflowController` - 状态机，保证同一时间最多一个模型调用
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/shell` - 交互式命令行
//! - `orchestrator/batch_grader` - 批量评分，管理并发
//! - `orchestrator/app` - 应用入口
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnswerKey, CapturedImage, GradedStudent, ScoreField, ScoringConfig, SectionScores};
pub use orchestrator::{App, BatchGrader, BatchOutcome, Shell};
pub use services::{Grader, KeyExtractor, LlmService, ResultsLedger, VisionModel};
pub use workflow::{WorkflowController, WorkflowState};
