//! LLM 翻译服务
//!
//! 通过兼容 OpenAI API 的聊天接口完成翻译。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 整个调用由 `tokio::time::timeout` 限时，超时即失败，不在这里重试

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::oracle::{check_batch_len, DocumentShape, TranslationOracle};
use crate::config::Config;
use crate::error::OracleError;
use crate::models::Language;
use crate::utils::truncate_text;

const TRANSLATION_RULES: &str = "\
You are a translator. You receive JSON data and translate every string value into the target language.

Rules:
- Write English service names as \"translated name (original name)\".
- Identifiers and names used as references must keep their meaning.
- Code written in English stays exactly as in the original.
- The output must have exactly the same structure as the input: same field names, same array lengths.
- Reply with JSON only, without any commentary.";

/// 批量翻译的请求 / 响应格式
#[derive(Debug, Serialize, Deserialize)]
struct BatchPayload {
    translated: Vec<String>,
}

/// LLM 翻译服务
pub struct LlmOracle {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout: Duration,
}

impl LlmOracle {
    /// 创建新的 LLM 翻译服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            timeout: Duration::from_secs(config.oracle_timeout_secs),
        }
    }

    /// 发送一次聊天请求，返回去掉首尾空白的文本
    async fn send_to_llm(&self, user_message: &str, system_message: &str) -> Result<String, OracleError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(|e| self.request_error(e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| self.request_error(e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(4096u32)
            .build()
            .map_err(|e| self.request_error(e))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时 ({} 秒)", self.timeout.as_secs());
                OracleError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                self.request_error(e)
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| OracleError::Request {
                model: self.model_name.clone(),
                message: "LLM 返回内容为空".to_string(),
            })?;

        Ok(content.trim().to_string())
    }

    fn request_error(&self, err: impl std::fmt::Display) -> OracleError {
        OracleError::Request {
            model: self.model_name.clone(),
            message: err.to_string(),
        }
    }

    fn system_prompt(language: Language) -> String {
        format!("{}\n\n# Target language:\n{}", TRANSLATION_RULES, language.name())
    }
}

#[async_trait]
impl TranslationOracle for LlmOracle {
    async fn translate_batch(
        &self,
        fragments: &[String],
        language: Language,
    ) -> Result<Vec<String>, OracleError> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let payload = serde_json::to_string(&BatchPayload {
            translated: fragments.to_vec(),
        })
        .map_err(|e| self.request_error(e))?;

        let response = self
            .send_to_llm(&payload, &Self::system_prompt(language))
            .await?;
        let parsed: BatchPayload = parse_json(&response)?;

        check_batch_len(fragments.len(), &parsed.translated)?;
        Ok(parsed.translated)
    }

    async fn translate_structured(
        &self,
        document: &Value,
        language: Language,
        shape: &DocumentShape,
    ) -> Result<Value, OracleError> {
        let payload = serde_json::to_string(document).map_err(|e| self.request_error(e))?;

        let response = self
            .send_to_llm(&payload, &Self::system_prompt(language))
            .await?;
        let translated: Value = parse_json(&response)?;

        shape.check(&translated)?;
        Ok(translated)
    }
}

/// 解析 LLM 返回的 JSON，解析失败视为结构不符
fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, OracleError> {
    let body = strip_code_fence(response);
    serde_json::from_str(&body).map_err(|e| OracleError::SchemaViolation {
        detail: format!("无法解析 LLM 返回的 JSON ({}): {}", e, truncate_text(&body, 120)),
    })
}

/// 去掉模型习惯性包上的 Markdown 代码块
fn strip_code_fence(response: &str) -> String {
    match Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$") {
        Ok(re) => re
            .captures(response)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| response.trim().to_string()),
        Err(_) => response.trim().to_string(),
    }
}
