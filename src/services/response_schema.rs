//! 模型响应结构 - 边界校验
//!
//! 外部模型返回的是无类型 JSON 文本。这里固定字段名和类型，
//! 严格解码后转换为强类型的 `AnswerKey` / `SectionScores`，不做任何静默修正。

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::error::{AppError, AppResult};
use crate::models::{
    AnswerKey, ComplexChoiceAnswer, EssayAnswer, MultipleChoiceAnswer, SectionScores,
};

const KEY_CONTEXT: &str = "答案键提取";
const GRADING_CONTEXT: &str = "答题卡评分";

/// 答案键提取的响应结构（JSON Schema）
pub fn key_extraction_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "multipleChoice": {
                "type": "array",
                "description": "单选题答案",
                "items": {
                    "type": "object",
                    "properties": {
                        "number": { "type": "integer", "description": "题号" },
                        "answer": { "type": "string", "description": "正确选项字母（A、B、C、D 或 E）" }
                    },
                    "required": ["number", "answer"]
                }
            },
            "complexMultipleChoice": {
                "type": "array",
                "description": "多选题答案（正确选项可能不止一个）",
                "items": {
                    "type": "object",
                    "properties": {
                        "number": { "type": "integer", "description": "题号" },
                        "answers": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "所有正确选项"
                        }
                    },
                    "required": ["number", "answers"]
                }
            },
            "essay": {
                "type": "array",
                "description": "问答题参考答案",
                "items": {
                    "type": "object",
                    "properties": {
                        "number": { "type": "integer", "description": "题号" },
                        "keyPoints": { "type": "string", "description": "参考答案的要点或摘要" }
                    },
                    "required": ["number", "keyPoints"]
                }
            }
        }
    })
}

/// 评分的响应结构（JSON Schema）
pub fn grading_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "multipleChoiceScore": { "type": "number", "description": "单选题部分总分" },
            "complexMultipleChoiceScore": { "type": "number", "description": "多选题部分总分" },
            "essayScore": { "type": "number", "description": "问答题部分总分" },
            "totalScore": { "type": "number", "description": "全卷总分" }
        },
        "required": ["multipleChoiceScore", "complexMultipleChoiceScore", "essayScore", "totalScore"]
    })
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("fence regex is valid")
    })
}

/// 去掉 Markdown 代码块包裹，返回其中的 JSON 文本
pub fn extract_json_payload(text: &str) -> &str {
    match fence_regex().captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

// ========== 答案键 ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct KeyResponse {
    #[serde(default)]
    multiple_choice: Vec<MultipleChoiceItem>,
    #[serde(default)]
    complex_multiple_choice: Vec<ComplexChoiceItem>,
    #[serde(default)]
    essay: Vec<EssayItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MultipleChoiceItem {
    number: u32,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComplexChoiceItem {
    number: u32,
    answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EssayItem {
    number: u32,
    key_points: String,
}

/// 解码并校验答案键响应
pub fn decode_answer_key(text: &str) -> AppResult<AnswerKey> {
    let payload = extract_json_payload(text);
    let raw: KeyResponse = serde_json::from_str(payload)
        .map_err(|e| AppError::response_invalid(KEY_CONTEXT, e))?;

    let mut numbers = SectionNumbers::new("multipleChoice");
    let mut multiple_choice = Vec::with_capacity(raw.multiple_choice.len());
    for item in raw.multiple_choice {
        numbers.check(item.number)?;
        let answer = option_token(&item.answer).ok_or_else(|| {
            AppError::response_invalid(
                KEY_CONTEXT,
                format!("单选题 {} 的答案无效: '{}'", item.number, item.answer),
            )
        })?;
        multiple_choice.push(MultipleChoiceAnswer {
            number: item.number,
            answer,
        });
    }

    let mut numbers = SectionNumbers::new("complexMultipleChoice");
    let mut complex_multiple_choice = Vec::with_capacity(raw.complex_multiple_choice.len());
    for item in raw.complex_multiple_choice {
        numbers.check(item.number)?;
        if item.answers.is_empty() {
            return Err(AppError::response_invalid(
                KEY_CONTEXT,
                format!("多选题 {} 没有正确选项", item.number),
            ));
        }
        let answers = item
            .answers
            .iter()
            .map(|a| option_token(a))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                AppError::response_invalid(
                    KEY_CONTEXT,
                    format!("多选题 {} 的答案无效: {:?}", item.number, item.answers),
                )
            })?;
        complex_multiple_choice.push(ComplexChoiceAnswer {
            number: item.number,
            answers,
        });
    }

    let mut numbers = SectionNumbers::new("essay");
    let mut essay = Vec::with_capacity(raw.essay.len());
    for item in raw.essay {
        numbers.check(item.number)?;
        if item.key_points.trim().is_empty() {
            return Err(AppError::response_invalid(
                KEY_CONTEXT,
                format!("问答题 {} 缺少要点", item.number),
            ));
        }
        essay.push(EssayAnswer {
            number: item.number,
            key_points: item.key_points,
        });
    }

    Ok(AnswerKey {
        multiple_choice,
        complex_multiple_choice,
        essay,
    })
}

/// 选项必须是不含空白的非空字符串（如 "B"）
fn option_token(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        None
    } else {
        Some(token.to_string())
    }
}

/// 题号从 1 开始，同一部分内不能重复
struct SectionNumbers {
    section: &'static str,
    seen: HashSet<u32>,
}

impl SectionNumbers {
    fn new(section: &'static str) -> Self {
        Self {
            section,
            seen: HashSet::new(),
        }
    }

    fn check(&mut self, number: u32) -> AppResult<()> {
        if number == 0 {
            return Err(AppError::response_invalid(
                KEY_CONTEXT,
                format!("{} 中出现题号 0", self.section),
            ));
        }
        if !self.seen.insert(number) {
            return Err(AppError::response_invalid(
                KEY_CONTEXT,
                format!("{} 中题号 {} 重复", self.section, number),
            ));
        }
        Ok(())
    }
}

// ========== 评分 ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GradingResponse {
    multiple_choice_score: f64,
    complex_multiple_choice_score: f64,
    essay_score: f64,
    total_score: f64,
}

/// 解码并校验评分响应
pub fn decode_section_scores(text: &str) -> AppResult<SectionScores> {
    let payload = extract_json_payload(text);
    let raw: GradingResponse = serde_json::from_str(payload)
        .map_err(|e| AppError::response_invalid(GRADING_CONTEXT, e))?;

    let fields = [
        ("multipleChoiceScore", raw.multiple_choice_score),
        ("complexMultipleChoiceScore", raw.complex_multiple_choice_score),
        ("essayScore", raw.essay_score),
        ("totalScore", raw.total_score),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::response_invalid(
                GRADING_CONTEXT,
                format!("{} 不是非负数: {}", name, value),
            ));
        }
    }

    Ok(SectionScores {
        multiple_choice_score: raw.multiple_choice_score,
        complex_multiple_choice_score: raw.complex_multiple_choice_score,
        essay_score: raw.essay_score,
        total_score: raw.total_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    fn is_invalid(result: AppResult<impl std::fmt::Debug>) -> bool {
        matches!(result, Err(AppError::Llm(LlmError::ResponseInvalid { .. })))
    }

    #[test]
    fn test_fence_is_stripped() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_payload(text), "{\"a\": 1}");
        assert_eq!(extract_json_payload("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_decode_answer_key_verbatim() {
        let key = decode_answer_key(
            r#"{"multipleChoice":[{"number":1,"answer":"B"}],"complexMultipleChoice":[],"essay":[]}"#,
        )
        .unwrap();
        assert_eq!(
            key.multiple_choice,
            vec![MultipleChoiceAnswer {
                number: 1,
                answer: "B".to_string()
            }]
        );
        assert!(key.complex_multiple_choice.is_empty());
        assert!(key.essay.is_empty());
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let key = decode_answer_key(r#"{"essay":[{"number":3,"keyPoints":"water cycle"}]}"#)
            .unwrap();
        assert!(key.multiple_choice.is_empty());
        assert_eq!(key.essay[0].key_points, "water cycle");
    }

    #[test]
    fn test_answer_key_violations() {
        // 题号类型错误
        assert!(is_invalid(decode_answer_key(
            r#"{"multipleChoice":[{"number":"1","answer":"B"}]}"#
        )));
        // 未知字段
        assert!(is_invalid(decode_answer_key(
            r#"{"multipleChoice":[],"trueFalse":[]}"#
        )));
        // 缺少必填字段
        assert!(is_invalid(decode_answer_key(
            r#"{"complexMultipleChoice":[{"number":2}]}"#
        )));
        // 重复题号
        assert!(is_invalid(decode_answer_key(
            r#"{"multipleChoice":[{"number":1,"answer":"A"},{"number":1,"answer":"C"}]}"#
        )));
        // 空答案
        assert!(is_invalid(decode_answer_key(
            r#"{"multipleChoice":[{"number":1,"answer":"  "}]}"#
        )));
        // 多选题没有选项
        assert!(is_invalid(decode_answer_key(
            r#"{"complexMultipleChoice":[{"number":4,"answers":[]}]}"#
        )));
        // 不是 JSON
        assert!(is_invalid(decode_answer_key("I could not read the sheet.")));
    }

    #[test]
    fn test_decode_scores() {
        let scores = decode_section_scores(
            "```json\n{\"multipleChoiceScore\":1,\"complexMultipleChoiceScore\":0,\"essayScore\":3,\"totalScore\":4}\n```",
        )
        .unwrap();
        assert_eq!(scores.multiple_choice_score, 1.0);
        assert_eq!(scores.complex_multiple_choice_score, 0.0);
        assert_eq!(scores.essay_score, 3.0);
        assert_eq!(scores.total_score, 4.0);
    }

    #[test]
    fn test_score_violations() {
        assert!(is_invalid(decode_section_scores(
            r#"{"multipleChoiceScore":1,"complexMultipleChoiceScore":0,"essayScore":3}"#
        )));
        assert!(is_invalid(decode_section_scores(
            r#"{"multipleChoiceScore":-1,"complexMultipleChoiceScore":0,"essayScore":3,"totalScore":2}"#
        )));
        assert!(is_invalid(decode_section_scores(
            r#"{"multipleChoiceScore":"1","complexMultipleChoiceScore":0,"essayScore":3,"totalScore":4}"#
        )));
    }

    #[test]
    fn test_schemas_name_all_fields() {
        let grading = grading_schema();
        assert_eq!(grading["required"].as_array().unwrap().len(), 4);

        let key = key_extraction_schema();
        for section in ["multipleChoice", "complexMultipleChoice", "essay"] {
            assert!(key["properties"].get(section).is_some());
        }
    }
}
