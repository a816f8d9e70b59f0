//! 评分结果模型

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 单份答题卡的各部分得分
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionScores {
    pub multiple_choice_score: f64,
    pub complex_multiple_choice_score: f64,
    pub essay_score: f64,
    /// 模型给出的总分，原样保留
    pub total_score: f64,
}

impl SectionScores {
    /// 三个部分得分之和
    pub fn sum_of_parts(&self) -> f64 {
        self.multiple_choice_score + self.complex_multiple_choice_score + self.essay_score
    }
}

/// 已评分学生记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedStudent {
    /// 从 1 开始，按评分完成顺序递增
    pub id: u32,
    pub scores: SectionScores,
    /// 图片来源（文件名或摄像头帧）
    pub source: String,
    pub graded_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graded_student_serializes_with_timestamp() {
        let record = GradedStudent {
            id: 1,
            scores: SectionScores {
                multiple_choice_score: 1.0,
                complex_multiple_choice_score: 0.0,
                essay_score: 3.0,
                total_score: 4.0,
            },
            source: "alice.png".to_string(),
            graded_at: Local::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["source"], "alice.png");
        assert_eq!(value["scores"]["totalScore"], 4.0);
        assert!(value["graded_at"].is_string());
    }
}
