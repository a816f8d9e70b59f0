//! LLM 服务 - 业务能力层
//!
//! 只负责"把一张图片和一段指令交给视觉模型"的能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点、Azure 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::CapturedImage;

/// 视觉模型能力
///
/// 答案键提取和评分都只依赖这个接口，测试时可替换为脚本化的实现。
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;

    /// 发送一张图片和指令，返回模型的原始文本响应
    async fn ask_with_image(
        &self,
        system_message: &str,
        user_message: &str,
        image: &CapturedImage,
    ) -> AppResult<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用 OpenAI 兼容的 chat completions API
/// - 图片以 base64 data URL 形式随用户消息发送
/// - 不解析响应内容
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    fn build_messages(
        &self,
        system_message: &str,
        user_message: &str,
        image: &CapturedImage,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()?;

        // 图片在前、指令在后
        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image.to_data_url(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ),
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: user_message.to_string(),
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl VisionModel for LlmService {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn ask_with_image(
        &self,
        system_message: &str,
        user_message: &str,
        image: &CapturedImage,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!(
            "用户消息长度: {} 字符, 图片: {} ({}, {} 字节)",
            user_message.len(),
            image.label,
            image.mime_type,
            image.bytes.len()
        );

        let messages = self.build_messages(system_message, user_message, image)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(LlmError::from)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> LlmService {
        let config = Config {
            llm_api_key: "test-key".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            ..Config::default()
        };
        LlmService::new(&config)
    }

    fn test_image() -> CapturedImage {
        CapturedImage::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0], "frame.jpg").unwrap()
    }

    #[test]
    fn test_build_messages_shape() {
        let service = create_test_service();
        let messages = service
            .build_messages("你是评分助手", "请评分", &test_image())
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert_eq!(service.model_name(), "gemini-2.5-flash");
    }

    /// 真实 API 测试，需要设置 LLM_API_KEY 和图片路径
    ///
    /// 运行方式：
    /// ```bash
    /// GRADER_TEST_IMAGE=key.jpg cargo test test_vision_api -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_vision_api() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().expect("需要 LLM_API_KEY");
        let service = LlmService::new(&config);
        let path = std::env::var("GRADER_TEST_IMAGE").expect("需要 GRADER_TEST_IMAGE");
        let image = crate::models::load_image_file(std::path::Path::new(&path))
            .await
            .unwrap();

        let response = service
            .ask_with_image("你是一个简洁的助手。", "请描述这张图片。", &image)
            .await
            .unwrap();
        println!("{}", response);
        assert!(!response.is_empty());
    }
}
