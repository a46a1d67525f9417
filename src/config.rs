use std::str::FromStr;

use tracing::warn;

use crate::error::ConfigError;
use crate::models::Language;

/// 一道题的翻译方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslationMode {
    /// 标题、选项、解析作为一个文档整体翻译
    Structured,
    /// 拆成文本片段批量翻译
    Batch,
}

impl TranslationMode {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "structured" => Some(TranslationMode::Structured),
            "batch" => Some(TranslationMode::Batch),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次翻译请求的超时时间（秒）
    pub oracle_timeout_secs: u64,
    pub translation_mode: TranslationMode,
    // --- 预取配置 ---
    /// 访问第 N 题时预先翻译 N+1 … N+K 题中的 K
    pub prediction_count: u64,
    /// 同时进行的预取翻译数量上限
    pub max_concurrent_prefetch: usize,
    // --- 演示程序 ---
    pub exam_language: Language,
    pub exam_question_count: usize,
    // --- 其他 ---
    /// 题库 TOML 文件目录
    pub question_bank_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            oracle_timeout_secs: 30,
            translation_mode: TranslationMode::Structured,
            prediction_count: 2,
            max_concurrent_prefetch: 4,
            exam_language: Language::Korean,
            exam_question_count: 5,
            question_bank_folder: "question_banks".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置，缺失或无法解析的值使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            oracle_timeout_secs: env_or("ORACLE_TIMEOUT_SECS", default.oracle_timeout_secs),
            translation_mode: std::env::var("TRANSLATION_MODE")
                .ok()
                .and_then(|v| parse_or_warn("TRANSLATION_MODE", &v, TranslationMode::from_name))
                .unwrap_or(default.translation_mode),
            prediction_count: env_or("PREDICTION_COUNT", default.prediction_count),
            max_concurrent_prefetch: env_or("MAX_CONCURRENT_PREFETCH", default.max_concurrent_prefetch),
            exam_language: std::env::var("EXAM_LANGUAGE")
                .ok()
                .and_then(|v| match Language::from_code(&v) {
                    Ok(language) => Some(language),
                    Err(e) => {
                        warn!("⚠️ {}，使用默认值", e);
                        None
                    }
                })
                .unwrap_or(default.exam_language),
            exam_question_count: env_or("EXAM_QUESTION_COUNT", default.exam_question_count),
            question_bank_folder: std::env::var("QUESTION_BANK_FOLDER").unwrap_or(default.question_bank_folder),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging),
        }
    }
}

/// 读取并解析环境变量；未设置时静默使用默认值，解析失败时警告
fn env_or<T: FromStr>(var_name: &str, default: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| parse_or_warn(var_name, &v, |raw| raw.trim().parse().ok()))
        .unwrap_or(default)
}

fn parse_or_warn<T>(var_name: &str, value: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(value);
    if parsed.is_none() {
        let err = ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        };
        warn!("⚠️ {}，使用默认值", err);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_mode_names() {
        assert_eq!(TranslationMode::from_name(" Batch "), Some(TranslationMode::Batch));
        assert_eq!(TranslationMode::from_name("structured"), Some(TranslationMode::Structured));
        assert_eq!(TranslationMode::from_name("xml"), None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.prediction_count, 2);
        assert_eq!(config.oracle_timeout_secs, 30);
        assert_eq!(config.translation_mode, TranslationMode::Structured);
    }

    #[test]
    fn test_parse_or_warn_falls_back_on_garbage() {
        assert_eq!(parse_or_warn("X", "12", |v| v.parse::<u64>().ok()), Some(12));
        assert_eq!(parse_or_warn("X", "twelve", |v| v.parse::<u64>().ok()), None);
    }
}
