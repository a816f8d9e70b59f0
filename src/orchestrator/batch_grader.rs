//! 批量评分器 - 编排层
//!
//! ## 职责
//!
//! 非交互模式：答案键只提取一次，然后并发评分整个文件夹的答题卡。
//!
//! ## 核心功能
//!
//! 1. **并发控制**：使用 Semaphore 限制同时进行的模型调用数量
//! 2. **单一写入者**：评分结果通过 mpsc 通道送到唯一持有账本的任务，
//!    序号按评分完成的顺序分配
//! 3. **失败隔离**：单份答题卡失败（包括任务异常退出）只记日志和计数，不写入账本
//! 4. **全局统计**：汇总成功 / 失败数量

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info};

use crate::error::{AppResult, WorkflowError};
use crate::models::{load_image_file, AnswerKey, ScoringConfig, SectionScores};
use crate::services::{Grader, ResultsLedger};

/// 单份答题卡的评分结果
struct GradingOutcome {
    label: String,
    result: AppResult<SectionScores>,
}

/// 批量评分结果
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub ledger: ResultsLedger,
    pub success: usize,
    /// (图片, 失败原因)
    pub failures: Vec<(String, String)>,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.success + self.failed()
    }
}

/// 批量评分器
pub struct BatchGrader {
    grader: Arc<Grader>,
    max_concurrent: usize,
}

impl BatchGrader {
    pub fn new(grader: Arc<Grader>, max_concurrent: usize) -> Self {
        Self {
            grader,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 并发评分所有答题卡
    pub async fn grade_all(
        &self,
        key: Arc<AnswerKey>,
        scoring: ScoringConfig,
        sheets: Vec<PathBuf>,
    ) -> AppResult<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (tx, rx) = mpsc::channel::<GradingOutcome>(self.max_concurrent * 2);

        // 唯一的账本写入者
        let writer = tokio::spawn(record_outcomes(rx));

        let mut handles = Vec::with_capacity(sheets.len());
        for path in sheets {
            // 信号量不会被关闭
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let grader = self.grader.clone();
            let key = key.clone();
            let tx = tx.clone();
            let label = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let task_label = label.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = match load_image_file(&path).await {
                    Ok(image) => grader.grade(&image, &key, &scoring).await,
                    Err(e) => Err(e.into()),
                };

                // 写入者只在所有发送端关闭后退出，这里不会失败
                let _ = tx
                    .send(GradingOutcome {
                        label: task_label,
                        result,
                    })
                    .await;
            });
            handles.push((label, handle));
        }
        drop(tx);

        let (labels, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let mut crashed = Vec::new();
        for (label, joined) in labels.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                error!("[{}] ❌ 评分任务异常退出: {}", label, e);
                crashed.push((label, e.to_string()));
            }
        }

        let mut outcome = writer.await.map_err(|e| {
            error!("成绩写入任务异常退出: {}", e);
            WorkflowError::TaskFailed(e.to_string())
        })?;
        outcome.failures.extend(crashed);
        Ok(outcome)
    }
}

/// 按完成顺序写入账本
async fn record_outcomes(mut rx: mpsc::Receiver<GradingOutcome>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    while let Some(GradingOutcome { label, result }) = rx.recv().await {
        match result {
            Ok(scores) => {
                let record = outcome.ledger.append(scores, label);
                info!(
                    "✓ 学生 #{} ({}) 总分 {}",
                    record.id, record.source, record.scores.total_score
                );
                outcome.success += 1;
            }
            Err(e) => {
                error!("[{}] ❌ 评分失败: {}", label, e);
                outcome.failures.push((label, e.to_string()));
            }
        }
    }

    outcome
}
