use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 图像采集错误（文件 / 摄像头）
    #[error("采集错误: {0}")]
    Capture(#[from] CaptureError),
    /// 外部模型调用错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 流程错误（前置条件缺失、状态不符等）
    #[error("流程错误: {0}")]
    Workflow(#[from] WorkflowError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
}

/// 图像采集错误
#[derive(Debug, Error)]
pub enum CaptureError {
    /// 摄像头不可用或拒绝访问
    #[error("无法访问摄像头 ({device}): {reason}")]
    Device { device: String, reason: String },
    /// 读取图片文件失败
    #[error("读取图片失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 图片数据为空
    #[error("图片数据为空: {label}")]
    Empty { label: String },
    /// 无法识别的图片格式
    #[error("不支持的图片格式: {label}")]
    UnsupportedFormat { label: String },
}

/// 外部模型调用错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 网络 / 配额 / API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {reason}")]
    ApiCallFailed { model: String, reason: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容不符合约定的结构
    #[error("LLM返回内容不符合结构约定 ({context}): {reason}")]
    ResponseInvalid { context: String, reason: String },
}

/// 流程错误
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// 缺少前置条件，动作在调用模型之前即被拒绝
    #[error("缺少前置条件: {0}")]
    MissingPrerequisite(&'static str),
    /// 当前状态不允许该操作
    #[error("当前状态 {current} 不允许该操作，需要处于 {expected}")]
    InvalidState {
        current: &'static str,
        expected: &'static str,
    },
    /// 已有模型调用正在进行
    #[error("已有请求正在处理中，请稍候")]
    Busy,
    /// 批量评分的后台任务异常退出
    #[error("批量评分任务异常退出: {0}")]
    TaskFailed(String),
    /// 分值无法转换为非负数
    #[error("分值无效 ({field}): '{value}'")]
    InvalidScoreValue { field: &'static str, value: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API 凭证（唯一的致命启动错误）
    #[error("环境变量 LLM_API_KEY（或 API_KEY）未设置")]
    MissingApiKey,
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
    /// 默认分值必须是非负有限数
    #[error("默认分值无效 ({field}): {value}，需要非负数")]
    InvalidDefaultScore { field: &'static str, value: f64 },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV写入失败: {0}")]
    Csv(#[from] csv::Error),
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<async_openai::error::OpenAIError> for LlmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        LlmError::ApiCallFailed {
            model: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Export(ExportError::Csv(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 LLM API 调用错误
    pub fn llm_api_failed(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            reason: reason.to_string(),
        })
    }

    /// 创建响应结构校验错误
    pub fn response_invalid(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Llm(LlmError::ResponseInvalid {
            context: context.into(),
            reason: reason.to_string(),
        })
    }

    /// 是否为缺少前置条件的错误
    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(self, AppError::Workflow(WorkflowError::MissingPrerequisite(_)))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_prerequisite_detection() {
        let err: AppError = WorkflowError::MissingPrerequisite("答案键").into();
        assert!(err.is_missing_prerequisite());

        let other = AppError::response_invalid("评分", "缺少字段");
        assert!(!other.is_missing_prerequisite());
    }

    #[test]
    fn test_display_contains_context() {
        let err = AppError::llm_api_failed("gemini-2.5-flash", "timeout");
        let text = err.to_string();
        assert!(text.contains("gemini-2.5-flash"));
        assert!(text.contains("timeout"));
    }
}
