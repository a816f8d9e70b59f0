//! 答案键提取服务 - 业务能力层
//!
//! 只负责"从答案卷图片中提取答案键"的能力

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{AnswerKey, CapturedImage};
use crate::services::llm_service::VisionModel;
use crate::services::response_schema::{decode_answer_key, key_extraction_schema};
use crate::utils::logging::truncate_text;

/// 答案键提取服务
pub struct KeyExtractor {
    model: Arc<dyn VisionModel>,
}

impl KeyExtractor {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// 从答案卷图片中提取答案键
    ///
    /// 响应必须严格符合 `key_extraction_schema()`，否则返回错误。
    pub async fn extract(&self, image: &CapturedImage) -> AppResult<AnswerKey> {
        info!(
            "🔍 正在分析答案卷 {} (模型: {})",
            image.label,
            self.model.model_name()
        );

        let (system_message, user_message) = build_key_messages();
        let response = self
            .model
            .ask_with_image(&system_message, &user_message, image)
            .await?;
        debug!("答案键原始响应: {}", truncate_text(&response, 200));

        let key = decode_answer_key(&response)?;
        info!("✓ 答案键提取完成: {}", key.summary());
        Ok(key)
    }
}

/// 构建答案键提取的消息
///
/// 返回 (system_message, user_message)
fn build_key_messages() -> (String, String) {
    let schema = serde_json::to_string_pretty(&key_extraction_schema()).unwrap_or_default();

    let system_message = format!(
        "你是分析教学文档的专家。你只输出一个 JSON 对象，不输出任何其他内容。\
         JSON 必须符合以下 JSON Schema，字段名和类型不得改变：\n{}",
        schema
    );

    let user_message = "请分析这张答案卷图片，提取每一类题目（单选题、多选题、问答题）的全部答案，\
                        按约定的 JSON 结构返回。没有的题型返回空数组。请确保准确。"
        .to_string();

    (system_message, user_message)
}
