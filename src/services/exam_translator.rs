//! 单题翻译 - 业务能力层
//!
//! 把一道考试题（标题、选项、解析）交给翻译服务，得到一条 `TranslationRecord`。
//! 这是单飞缓存里每个键的计算本体，自身不做缓存也不做重试。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clients::oracle::check_batch_len;
use crate::clients::{DocumentShape, TranslationOracle};
use crate::config::TranslationMode;
use crate::error::{AppError, AppResult};
use crate::infrastructure::ExamStore;
use crate::models::{Answer, Language, Question, TranslationKey, TranslationRecord};
use crate::utils::truncate_text;

/// 按键翻译一道题
#[async_trait]
pub trait QuestionTranslator: Send + Sync {
    async fn translate(&self, key: TranslationKey) -> AppResult<TranslationRecord>;
}

/// 送去翻译的文档
///
/// `options` 按选项 id 升序排列，译文按下标对回选项 id。
#[derive(Debug, Serialize, Deserialize)]
struct QuestionDocument {
    title: String,
    options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

/// 基于存储 + 翻译服务的实现
pub struct ExamTranslator {
    store: Arc<dyn ExamStore>,
    oracle: Arc<dyn TranslationOracle>,
    mode: TranslationMode,
}

impl ExamTranslator {
    pub fn new(
        store: Arc<dyn ExamStore>,
        oracle: Arc<dyn TranslationOracle>,
        mode: TranslationMode,
    ) -> Self {
        Self {
            store,
            oracle,
            mode,
        }
    }

    /// 整题作为一个结构化文档翻译
    async fn translate_structured(
        &self,
        question: &Question,
        answers: &[Answer],
        language: Language,
    ) -> AppResult<QuestionDocument> {
        let document = serde_json::to_value(QuestionDocument {
            title: question.title.clone(),
            options: answers.iter().map(|a| a.text.clone()).collect(),
            explanation: question.explanation.clone(),
        })
        .map_err(|e| AppError::schema_violation(format!("题目序列化失败: {}", e)))?;
        let shape = DocumentShape::of(&document);

        let translated = self
            .oracle
            .translate_structured(&document, language, &shape)
            .await?;

        serde_json::from_value(translated)
            .map_err(|e| AppError::schema_violation(format!("译文无法解析为题目: {}", e)))
    }

    /// 拆成 [标题, 选项…, 解析?] 片段批量翻译
    async fn translate_fragments(
        &self,
        question: &Question,
        answers: &[Answer],
        language: Language,
    ) -> AppResult<QuestionDocument> {
        let mut fragments = Vec::with_capacity(answers.len() + 2);
        fragments.push(question.title.clone());
        fragments.extend(answers.iter().map(|a| a.text.clone()));
        if let Some(explanation) = &question.explanation {
            fragments.push(explanation.clone());
        }

        let translated = self.oracle.translate_batch(&fragments, language).await?;
        check_batch_len(fragments.len(), &translated)?;
        let mut translated = translated.into_iter();

        let title = translated.next().unwrap_or_default();
        let options: Vec<String> = translated.by_ref().take(answers.len()).collect();
        let explanation = question.explanation.as_ref().and(translated.next());

        Ok(QuestionDocument {
            title,
            options,
            explanation,
        })
    }
}

#[async_trait]
impl QuestionTranslator for ExamTranslator {
    async fn translate(&self, key: TranslationKey) -> AppResult<TranslationRecord> {
        let exam = self.store.load_exam(key.exam_id).await?;
        let exam_question = self
            .store
            .load_exam_question(key.exam_id, key.ordinal)
            .await?;
        let question = self.store.load_question(exam_question.question_id).await?;

        let mut answers = question.answers.clone();
        answers.sort_by_key(|a| a.id);

        debug!(
            "🌐 翻译 {} -> {}: {}",
            key,
            exam.language,
            truncate_text(&question.title, 40)
        );

        let document = match self.mode {
            TranslationMode::Structured => {
                self.translate_structured(&question, &answers, exam.language)
                    .await?
            }
            TranslationMode::Batch => {
                self.translate_fragments(&question, &answers, exam.language)
                    .await?
            }
        };

        if document.options.len() != answers.len() {
            return Err(AppError::schema_violation(format!(
                "选项数量应为 {}，实际为 {}",
                answers.len(),
                document.options.len()
            )));
        }

        let record = TranslationRecord {
            title: document.title,
            answers: answers
                .iter()
                .map(|a| a.id)
                .zip(document.options)
                .collect::<HashMap<_, _>>(),
            explanation: document.explanation,
        };
        record.check_covers(&answers)?;

        info!("✓ 翻译完成 {}: {}", key, truncate_text(&record.title, 40));
        Ok(record)
    }
}
