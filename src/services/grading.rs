//! 评分服务 - 业务能力层
//!
//! 只负责"按答案键和分值给一份答题卡评分"的能力。
//! 评分判断完全交给外部模型，本地只做结构校验和总分一致性检查。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{AnswerKey, CapturedImage, ScoringConfig, SectionScores};
use crate::services::llm_service::VisionModel;
use crate::services::response_schema::{decode_section_scores, grading_schema};
use crate::utils::logging::truncate_text;

/// 评分服务
///
/// 无状态，可在多个并发任务间共享
pub struct Grader {
    model: Arc<dyn VisionModel>,
    strict_totals: bool,
    total_tolerance: f64,
}

impl Grader {
    pub fn new(model: Arc<dyn VisionModel>, config: &Config) -> Self {
        Self {
            model,
            strict_totals: config.strict_totals,
            total_tolerance: config.total_tolerance,
        }
    }

    /// 给一份答题卡评分
    pub async fn grade(
        &self,
        image: &CapturedImage,
        key: &AnswerKey,
        scoring: &ScoringConfig,
    ) -> AppResult<SectionScores> {
        debug!("📝 正在评分 {} (模型: {})", image.label, self.model.model_name());

        let (system_message, user_message) = build_grading_messages(key, scoring);
        let response = self
            .model
            .ask_with_image(&system_message, &user_message, image)
            .await?;
        debug!("评分原始响应: {}", truncate_text(&response, 200));

        let scores = decode_section_scores(&response)?;
        self.check_total(&scores, &image.label)?;

        info!(
            "✓ {} 评分完成: 单选 {} / 多选 {} / 问答 {} / 总分 {}",
            image.label,
            scores.multiple_choice_score,
            scores.complex_multiple_choice_score,
            scores.essay_score,
            scores.total_score
        );
        Ok(scores)
    }

    /// 总分与各部分之和的一致性检查
    ///
    /// 宽松模式下只记录警告，总分保持模型给出的值。
    fn check_total(&self, scores: &SectionScores, label: &str) -> AppResult<()> {
        let sum = scores.sum_of_parts();
        if (sum - scores.total_score).abs() <= self.total_tolerance {
            return Ok(());
        }

        if self.strict_totals {
            return Err(AppError::response_invalid(
                "答题卡评分",
                format!("总分 {} 与各部分之和 {} 不一致", scores.total_score, sum),
            ));
        }

        warn!(
            "⚠️ {} 的总分 {} 与各部分之和 {} 不一致，保留模型给出的总分",
            label, scores.total_score, sum
        );
        Ok(())
    }
}

/// 构建评分消息
///
/// 返回 (system_message, user_message)
fn build_grading_messages(key: &AnswerKey, scoring: &ScoringConfig) -> (String, String) {
    let schema = serde_json::to_string_pretty(&grading_schema()).unwrap_or_default();
    let key_json = serde_json::to_string_pretty(key).unwrap_or_default();

    let system_message = format!(
        "你是一个 AI 阅卷助手。你只输出一个 JSON 对象，不输出任何其他内容。\
         JSON 必须符合以下 JSON Schema，字段名和类型不得改变：\n{}",
        schema
    );

    let user_message = format!(
        r#"你的任务是根据给定的答案键和评分规则，给图片中学生的答题卡评分。

【答案键】
{}

【评分规则】
- 单选题：每答对一题得 {} 分。
- 多选题：每题全部选项正确得 {} 分，不给部分分。
- 问答题：每题最高 {} 分，根据学生答案与要点的契合程度给分。

【步骤】
1. 识别图片中学生的答题卡。
2. 将学生的答案与【答案键】逐题比较。
3. 按【评分规则】计算每一部分的得分。
4. 返回每一部分的得分和全卷总分。"#,
        key_json, scoring.multiple_choice, scoring.complex_multiple_choice, scoring.essay
    );

    (system_message, user_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultipleChoiceAnswer;

    #[test]
    fn test_grading_prompt_embeds_key_and_points() {
        let key = AnswerKey {
            multiple_choice: vec![MultipleChoiceAnswer {
                number: 1,
                answer: "B".to_string(),
            }],
            ..AnswerKey::default()
        };
        let scoring = ScoringConfig {
            multiple_choice: 1.0,
            complex_multiple_choice: 2.0,
            essay: 5.5,
        };

        let (system_message, user_message) = build_grading_messages(&key, &scoring);
        assert!(system_message.contains("totalScore"));
        assert!(user_message.contains("\"answer\": \"B\""));
        assert!(user_message.contains("每答对一题得 1 分"));
        assert!(user_message.contains("全部选项正确得 2 分"));
        assert!(user_message.contains("每题最高 5.5 分"));
    }
}
