//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责启动、交互和批量调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 持有配置和模型客户端
//! - 启动交互模式或批量模式
//!
//! ### `shell` - 交互式命令行
//! - 逐行解析命令，驱动 `WorkflowController`
//! - 持有摄像头会话（进入扫描步骤时打开，离开时释放）
//!
//! ### `batch_grader` - 批量评分器
//! - 控制并发数量（Semaphore）
//! - 唯一的账本写入者，序号按完成顺序分配
//!
//! ## 层次关系
//!
//! ```text
//! app / shell / batch_grader
//!     ↓
//! workflow::WorkflowController (会话状态机)
//!     ↓
//! services (能力层：答案键提取 / 评分 / 账本 / CSV)
//!     ↓
//! infrastructure (基础设施：摄像头)
//! ```

pub mod app;
pub mod batch_grader;
pub mod shell;

// 重新导出主要类型
pub use app::App;
pub use batch_grader::{BatchGrader, BatchOutcome};
pub use shell::Shell;
