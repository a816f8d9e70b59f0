//! 集成测试共用的脚本化模型
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use answer_sheet_grader::error::AppResult;
use answer_sheet_grader::services::VisionModel;
use answer_sheet_grader::{AppError, CapturedImage, Config};

pub const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

pub const KEY_RESPONSE: &str = r#"```json
{
  "multipleChoice": [
    {"number": 1, "answer": "B"},
    {"number": 2, "answer": "D"}
  ],
  "complexMultipleChoice": [
    {"number": 1, "answers": ["A", "C"]}
  ],
  "essay": [
    {"number": 1, "keyPoints": "光合作用需要光照、二氧化碳和水"}
  ]
}
```"#;

pub fn scores_response(mc: f64, complex: f64, essay: f64, total: f64) -> String {
    format!(
        r#"{{"multipleChoiceScore": {}, "complexMultipleChoiceScore": {}, "essayScore": {}, "totalScore": {}}}"#,
        mc, complex, essay, total
    )
}

pub fn test_config() -> Config {
    Config {
        llm_api_key: "test-key".to_string(),
        ..Config::default()
    }
}

pub fn png(label: &str) -> CapturedImage {
    CapturedImage::from_bytes(PNG_HEADER.to_vec(), label).unwrap()
}

/// 按脚本返回响应的模型
///
/// 优先按图片名匹配，没有匹配时按顺序取队列中的下一条
#[derive(Default)]
pub struct ScriptedModel {
    queue: Mutex<VecDeque<AppResult<String>>>,
    by_label: HashMap<String, String>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn queue(replies: Vec<AppResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn by_label(replies: Vec<(&str, String)>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            by_label: replies
                .into_iter()
                .map(|(label, reply)| (label.to_string(), reply))
                .collect(),
            delay,
            ..Self::default()
        })
    }

    /// 每张图片各自的响应延迟，用于控制完成顺序
    pub fn staggered(replies: Vec<(&str, String, Duration)>) -> Arc<Self> {
        let mut by_label = HashMap::new();
        let mut delays = HashMap::new();
        for (label, reply, delay) in replies {
            by_label.insert(label.to_string(), reply);
            delays.insert(label.to_string(), delay);
        }
        Arc::new(Self {
            by_label,
            delays,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn ask_with_image(
        &self,
        _system_message: &str,
        _user_message: &str,
        image: &CapturedImage,
    ) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&image.label).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = self.by_label.get(&image.label) {
            return Ok(reply.clone());
        }

        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::llm_api_failed("scripted", "脚本已用完")))
    }
}
