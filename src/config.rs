use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{ScoreField, ScoringConfig};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 评分配置 ---
    /// 进入配置步骤时的默认分值
    pub default_scores: ScoringConfig,
    /// 总分与各部分之和不一致时是否视为错误
    pub strict_totals: bool,
    /// 总分一致性检查的容差
    pub total_tolerance: f64,
    // --- 运行配置 ---
    /// 批量模式下同时评分的答题卡数量
    pub max_concurrent_gradings: usize,
    /// 摄像头拍照命令，输出一帧图像到 stdout
    pub camera_command: Option<Vec<String>>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            llm_temperature: 0.1,
            llm_max_tokens: 4096,
            default_scores: ScoringConfig::default(),
            strict_totals: false,
            total_tolerance: 0.01,
            max_concurrent_gradings: 4,
            camera_command: None,
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    llm_temperature: Option<f32>,
    llm_max_tokens: Option<u32>,
    multiple_choice_points: Option<f64>,
    complex_multiple_choice_points: Option<f64>,
    essay_points: Option<f64>,
    strict_totals: Option<bool>,
    total_tolerance: Option<f64>,
    max_concurrent_gradings: Option<usize>,
    camera_command: Option<Vec<String>>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    ///
    /// API 凭证只在此处读取一次，缺失时返回 `ConfigError::MissingApiKey`。
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            let content =
                std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                })?;
            config.apply_toml(&content, &path.display().to_string())?;
        }

        config.apply_env(|name| std::env::var(name).ok())?;

        if config.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(config)
    }

    fn apply_toml(&mut self, content: &str, path: &str) -> Result<(), ConfigError> {
        let file: FileConfig =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            })?;

        if let Some(v) = file.llm_api_key {
            self.llm_api_key = v;
        }
        if let Some(v) = file.llm_api_base_url {
            self.llm_api_base_url = v;
        }
        if let Some(v) = file.llm_model_name {
            self.llm_model_name = v;
        }
        if let Some(v) = file.llm_temperature {
            self.llm_temperature = v;
        }
        if let Some(v) = file.llm_max_tokens {
            self.llm_max_tokens = v;
        }
        if let Some(v) = file.multiple_choice_points {
            self.default_scores.multiple_choice = v;
        }
        if let Some(v) = file.complex_multiple_choice_points {
            self.default_scores.complex_multiple_choice = v;
        }
        if let Some(v) = file.essay_points {
            self.default_scores.essay = v;
        }
        if let Some(v) = file.strict_totals {
            self.strict_totals = v;
        }
        if let Some(v) = file.total_tolerance {
            self.total_tolerance = v;
        }
        if let Some(v) = file.max_concurrent_gradings {
            self.max_concurrent_gradings = v.max(1);
        }
        if let Some(v) = file.camera_command {
            self.camera_command = Some(v).filter(|c| !c.is_empty());
        }
        if let Some(v) = file.verbose_logging {
            self.verbose_logging = v;
        }
        self.check_default_scores()
    }

    fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var("LLM_API_KEY").or_else(|| var("API_KEY")) {
            self.llm_api_key = key;
        }
        if let Some(v) = var("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = var("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = parse_var(&var, "LLM_TEMPERATURE", "f32")? {
            self.llm_temperature = v;
        }
        if let Some(v) = parse_var(&var, "LLM_MAX_TOKENS", "u32")? {
            self.llm_max_tokens = v;
        }
        if let Some(v) = parse_var(&var, "DEFAULT_MULTIPLE_CHOICE_POINTS", "f64")? {
            self.default_scores.multiple_choice = v;
        }
        if let Some(v) = parse_var(&var, "DEFAULT_COMPLEX_MULTIPLE_CHOICE_POINTS", "f64")? {
            self.default_scores.complex_multiple_choice = v;
        }
        if let Some(v) = parse_var(&var, "DEFAULT_ESSAY_POINTS", "f64")? {
            self.default_scores.essay = v;
        }
        if let Some(v) = parse_var(&var, "STRICT_TOTALS", "bool")? {
            self.strict_totals = v;
        }
        if let Some(v) = parse_var::<usize, _>(&var, "MAX_CONCURRENT_GRADINGS", "usize")? {
            self.max_concurrent_gradings = v.max(1);
        }
        if let Some(v) = var("CAMERA_COMMAND") {
            let parts: Vec<String> = v.split_whitespace().map(str::to_string).collect();
            self.camera_command = Some(parts).filter(|c| !c.is_empty());
        }
        if let Some(v) = parse_var(&var, "VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        self.check_default_scores()
    }

    /// 默认分值与手动输入遵守同一约束：非负有限数
    fn check_default_scores(&self) -> Result<(), ConfigError> {
        for field in ScoreField::ALL {
            let value = self.default_scores.get(field);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDefaultScore {
                    field: field.name(),
                    value,
                });
            }
        }
        Ok(())
    }
}

fn parse_var<T, F>(var: &F, name: &str, expected_type: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type,
            }),
    }
}
