use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::language::Language;

pub type AnswerId = u64;
pub type QuestionId = u64;
pub type ExamId = u64;

/// 选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// 题目（题库中的原始题目，源语言）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub answers: Vec<Answer>,
}

impl Question {
    /// 正确选项的 id 集合
    pub fn correct_ids(&self) -> HashSet<AnswerId> {
        self.answers
            .iter()
            .filter(|a| a.correct)
            .map(|a| a.id)
            .collect()
    }
}

/// 题库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

/// 考试
///
/// `seed` 在创建时确定且永不改变；它和题目序号一起决定选项顺序。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub seed: i64,
    pub language: Language,
    pub question_bank_id: u64,
    /// 按序号排列的题目 id
    pub question_ids: Vec<QuestionId>,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    pub fn question_count(&self) -> u64 {
        self.question_ids.len() as u64
    }
}

/// 考试中的一道题（每场考试一份）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub exam_id: ExamId,
    /// 序号，从 0 开始
    pub no: u64,
    pub question_id: QuestionId,
    pub marked: bool,
    /// 用户提交的选项标签，未作答时为空
    pub user_answers: Vec<String>,
    /// 首次提交前为 None
    pub correct: Option<bool>,
}

impl ExamQuestion {
    pub fn new(exam_id: ExamId, no: u64, question_id: QuestionId) -> Self {
        Self {
            exam_id,
            no,
            question_id,
            marked: false,
            user_answers: Vec::new(),
            correct: None,
        }
    }

    /// 是否已作答
    pub fn is_answered(&self) -> bool {
        !self.user_answers.is_empty()
    }
}

/// 翻译缓存键：哪场考试的第几题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    pub exam_id: ExamId,
    pub ordinal: u64,
}

impl TranslationKey {
    pub fn new(exam_id: ExamId, ordinal: u64) -> Self {
        Self { exam_id, ordinal }
    }
}

impl Display for TranslationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[考试 #{} 题目 #{}]", self.exam_id, self.ordinal)
    }
}

/// 一道题的翻译结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub title: String,
    /// 原始选项 id → 译文
    pub answers: HashMap<AnswerId, String>,
    pub explanation: Option<String>,
}

impl TranslationRecord {
    /// 检查译文选项与题目选项一一对应，不多不少
    pub fn check_covers(&self, answers: &[Answer]) -> AppResult<()> {
        let expected: HashSet<AnswerId> = answers.iter().map(|a| a.id).collect();
        let actual: HashSet<AnswerId> = self.answers.keys().copied().collect();
        if expected != actual {
            return Err(AppError::schema_violation(format!(
                "译文选项 {:?} 与题目选项 {:?} 不一致",
                sorted(&actual),
                sorted(&expected)
            )));
        }
        Ok(())
    }
}

fn sorted(ids: &HashSet<AnswerId>) -> Vec<AnswerId> {
    let mut ids: Vec<AnswerId> = ids.iter().copied().collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: AnswerId, correct: bool) -> Answer {
        Answer {
            id,
            text: format!("answer {}", id),
            correct,
        }
    }

    #[test]
    fn test_check_covers_requires_exact_key_set() {
        let answers = vec![answer(1, true), answer(2, false)];
        let mut record = TranslationRecord {
            title: "t".to_string(),
            answers: HashMap::from([(1, "a".to_string()), (2, "b".to_string())]),
            explanation: None,
        };
        assert!(record.check_covers(&answers).is_ok());

        record.answers.insert(3, "c".to_string());
        assert!(record.check_covers(&answers).is_err());

        record.answers.remove(&3);
        record.answers.remove(&2);
        assert!(record.check_covers(&answers).is_err());
    }

    #[test]
    fn test_question_deserializes_from_toml() {
        let raw = r#"
            id = 5
            title = "Capital of France?"

            [[answers]]
            id = 1
            text = "Paris"
            correct = true

            [[answers]]
            id = 2
            text = "Lyon"
        "#;
        let question: Question = toml::from_str(raw).unwrap();
        assert_eq!(question.explanation, None);
        assert_eq!(question.correct_ids(), HashSet::from([1]));
        assert!(!question.answers[1].correct);
    }

    #[test]
    fn test_translation_key_display() {
        assert_eq!(TranslationKey::new(3, 9).to_string(), "[考试 #3 题目 #9]");
    }
}
