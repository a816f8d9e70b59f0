//! 答案键模型
//!
//! 由外部模型从答案卷图片中提取，会话内只读

use serde::{Deserialize, Serialize};

/// 单选题答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceAnswer {
    /// 题号
    pub number: u32,
    /// 正确选项字母
    pub answer: String,
}

/// 多选题答案（正确选项可能不止一个）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexChoiceAnswer {
    pub number: u32,
    /// 所有正确选项
    pub answers: Vec<String>,
}

/// 问答题要点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayAnswer {
    pub number: u32,
    /// 参考答案的要点或摘要
    pub key_points: String,
}

/// 答案键
///
/// 序列化字段名与模型响应一致，嵌入评分提示词时直接使用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKey {
    pub multiple_choice: Vec<MultipleChoiceAnswer>,
    pub complex_multiple_choice: Vec<ComplexChoiceAnswer>,
    pub essay: Vec<EssayAnswer>,
}

impl AnswerKey {
    /// 题目总数
    pub fn item_count(&self) -> usize {
        self.multiple_choice.len() + self.complex_multiple_choice.len() + self.essay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// 一行摘要，用于日志
    pub fn summary(&self) -> String {
        format!(
            "单选 {} 题 / 多选 {} 题 / 问答 {} 题",
            self.multiple_choice.len(),
            self.complex_multiple_choice.len(),
            self.essay.len()
        )
    }
}
