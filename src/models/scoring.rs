//! 分值配置

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// 分值配置
///
/// 三个字段均为非负有限数。开始扫描后在本轮内不再修改。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    /// 单选题每题分值
    pub multiple_choice: f64,
    /// 多选题每题分值（全对才得分）
    pub complex_multiple_choice: f64,
    /// 问答题每题最高分
    pub essay: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            multiple_choice: 1.0,
            complex_multiple_choice: 2.0,
            essay: 5.0,
        }
    }
}

impl ScoringConfig {
    pub fn get(&self, field: ScoreField) -> f64 {
        match field {
            ScoreField::MultipleChoice => self.multiple_choice,
            ScoreField::ComplexMultipleChoice => self.complex_multiple_choice,
            ScoreField::Essay => self.essay,
        }
    }

    pub fn set(&mut self, field: ScoreField, value: f64) {
        match field {
            ScoreField::MultipleChoice => self.multiple_choice = value,
            ScoreField::ComplexMultipleChoice => self.complex_multiple_choice = value,
            ScoreField::Essay => self.essay = value,
        }
    }
}

impl Display for ScoringConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "单选 {} 分/题, 多选 {} 分/题, 问答 最高 {} 分/题",
            self.multiple_choice, self.complex_multiple_choice, self.essay
        )
    }
}

/// 分值配置中的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreField {
    MultipleChoice,
    ComplexMultipleChoice,
    Essay,
}

impl ScoreField {
    pub const ALL: [ScoreField; 3] = [
        ScoreField::MultipleChoice,
        ScoreField::ComplexMultipleChoice,
        ScoreField::Essay,
    ];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            ScoreField::MultipleChoice => "multiple-choice",
            ScoreField::ComplexMultipleChoice => "complex-multiple-choice",
            ScoreField::Essay => "essay",
        }
    }

    /// 将输入转换为分值
    ///
    /// 空字符串视为 0；非数字、非有限值和负数被拒绝。
    pub fn coerce(self, raw: &str) -> Result<f64, WorkflowError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(0.0);
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(WorkflowError::InvalidScoreValue {
                field: self.name(),
                value: raw.to_string(),
            }),
        }
    }
}

impl FromStr for ScoreField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mc" | "multiple-choice" | "multiplechoice" | "single" => {
                Ok(ScoreField::MultipleChoice)
            }
            "complex" | "complex-multiple-choice" | "complexmultiplechoice" | "multi" => {
                Ok(ScoreField::ComplexMultipleChoice)
            }
            "essay" => Ok(ScoreField::Essay),
            other => Err(format!("未知的分值字段: {}", other)),
        }
    }
}
