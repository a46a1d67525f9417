//! 考试存储 - 基础设施层
//!
//! 持久化是外部协作者：这里只定义核心需要的读写能力，并提供一个内存实现
//! 给测试和演示程序使用。实现方保证每个调用都是原子且强一致的。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{AppError, AppResult, ExamError};
use crate::models::{
    Answer, Exam, ExamId, ExamQuestion, Language, Question, QuestionBank, QuestionId,
};

/// 考试存储
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn load_exam(&self, exam_id: ExamId) -> AppResult<Exam>;

    async fn load_exam_question(&self, exam_id: ExamId, ordinal: u64) -> AppResult<ExamQuestion>;

    async fn load_question(&self, question_id: QuestionId) -> AppResult<Question>;

    async fn load_answers(&self, question_id: QuestionId) -> AppResult<Vec<Answer>>;

    /// 保存提交的标签和判定结果
    async fn save_submission(
        &self,
        exam_id: ExamId,
        ordinal: u64,
        labels: Vec<String>,
        correct: bool,
    ) -> AppResult<()>;

    async fn save_mark(&self, exam_id: ExamId, ordinal: u64, marked: bool) -> AppResult<()>;

    async fn question_count(&self, exam_id: ExamId) -> AppResult<u64>;

    /// 按序号排列的所有题目状态
    async fn list_exam_questions(&self, exam_id: ExamId) -> AppResult<Vec<ExamQuestion>>;
}

#[derive(Default)]
struct StoreState {
    banks: HashMap<u64, QuestionBank>,
    questions: HashMap<QuestionId, Question>,
    exams: HashMap<ExamId, Exam>,
    exam_questions: HashMap<(ExamId, u64), ExamQuestion>,
    next_exam_id: ExamId,
}

/// 内存存储
#[derive(Default)]
pub struct InMemoryExamStore {
    state: RwLock<StoreState>,
}

impl InMemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记题库（题目 id 全局唯一，重复登记会覆盖）
    pub async fn insert_bank(&self, bank: QuestionBank) {
        let mut state = self.state.write().await;
        for question in &bank.questions {
            state.questions.insert(question.id, question.clone());
        }
        state.banks.insert(bank.id, bank);
    }

    /// 从题库随机抽题创建考试，种子随机生成
    pub async fn create_exam(
        &self,
        bank_id: u64,
        language: Language,
        question_count: usize,
    ) -> AppResult<ExamId> {
        let (seed, question_ids) = {
            let state = self.state.read().await;
            let bank = state
                .banks
                .get(&bank_id)
                .ok_or(ExamError::BankNotFound { bank_id })?;
            if bank.questions.len() < question_count {
                return Err(ExamError::NotEnoughQuestions {
                    bank_id,
                    available: bank.questions.len(),
                    requested: question_count,
                }
                .into());
            }

            let mut rng = rand::thread_rng();
            let ids: Vec<QuestionId> = bank
                .questions
                .choose_multiple(&mut rng, question_count)
                .map(|q| q.id)
                .collect();
            (rand::random::<i64>(), ids)
        };

        self.insert_exam(bank_id, language, seed, question_ids).await
    }

    /// 用给定的种子和题目顺序创建考试
    pub async fn insert_exam(
        &self,
        bank_id: u64,
        language: Language,
        seed: i64,
        question_ids: Vec<QuestionId>,
    ) -> AppResult<ExamId> {
        let mut state = self.state.write().await;
        if let Some(missing) = question_ids
            .iter()
            .find(|id| !state.questions.contains_key(*id))
        {
            return Err(AppError::storage(format!("题目不存在: {}", missing)));
        }

        state.next_exam_id += 1;
        let exam_id = state.next_exam_id;

        for (no, question_id) in question_ids.iter().enumerate() {
            state.exam_questions.insert(
                (exam_id, no as u64),
                ExamQuestion::new(exam_id, no as u64, *question_id),
            );
        }
        state.exams.insert(
            exam_id,
            Exam {
                id: exam_id,
                seed,
                language,
                question_bank_id: bank_id,
                question_ids,
                created_at: Utc::now(),
            },
        );

        info!("✓ 创建考试 #{} (题库 {}, 语言 {})", exam_id, bank_id, language);
        Ok(exam_id)
    }
}

#[async_trait]
impl ExamStore for InMemoryExamStore {
    async fn load_exam(&self, exam_id: ExamId) -> AppResult<Exam> {
        self.state
            .read()
            .await
            .exams
            .get(&exam_id)
            .cloned()
            .ok_or_else(|| AppError::exam_not_found(exam_id))
    }

    async fn load_exam_question(&self, exam_id: ExamId, ordinal: u64) -> AppResult<ExamQuestion> {
        self.state
            .read()
            .await
            .exam_questions
            .get(&(exam_id, ordinal))
            .cloned()
            .ok_or_else(|| AppError::question_not_found(exam_id, ordinal))
    }

    async fn load_question(&self, question_id: QuestionId) -> AppResult<Question> {
        self.state
            .read()
            .await
            .questions
            .get(&question_id)
            .cloned()
            .ok_or_else(|| AppError::storage(format!("题目不存在: {}", question_id)))
    }

    async fn load_answers(&self, question_id: QuestionId) -> AppResult<Vec<Answer>> {
        Ok(self.load_question(question_id).await?.answers)
    }

    async fn save_submission(
        &self,
        exam_id: ExamId,
        ordinal: u64,
        labels: Vec<String>,
        correct: bool,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let question = state
            .exam_questions
            .get_mut(&(exam_id, ordinal))
            .ok_or_else(|| AppError::question_not_found(exam_id, ordinal))?;
        question.user_answers = labels;
        question.correct = Some(correct);
        Ok(())
    }

    async fn save_mark(&self, exam_id: ExamId, ordinal: u64, marked: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let question = state
            .exam_questions
            .get_mut(&(exam_id, ordinal))
            .ok_or_else(|| AppError::question_not_found(exam_id, ordinal))?;
        question.marked = marked;
        Ok(())
    }

    async fn question_count(&self, exam_id: ExamId) -> AppResult<u64> {
        Ok(self.load_exam(exam_id).await?.question_count())
    }

    async fn list_exam_questions(&self, exam_id: ExamId) -> AppResult<Vec<ExamQuestion>> {
        let state = self.state.read().await;
        let exam = state
            .exams
            .get(&exam_id)
            .ok_or_else(|| AppError::exam_not_found(exam_id))?;

        (0..exam.question_count())
            .map(|no| {
                state
                    .exam_questions
                    .get(&(exam_id, no))
                    .cloned()
                    .ok_or_else(|| AppError::question_not_found(exam_id, no))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(question_count: u64) -> QuestionBank {
        QuestionBank {
            id: 1,
            name: "bank".to_string(),
            questions: (1..=question_count)
                .map(|id| Question {
                    id,
                    title: format!("question {}", id),
                    explanation: None,
                    answers: vec![Answer {
                        id: id * 10,
                        text: "yes".to_string(),
                        correct: true,
                    }],
                })
                .collect(),
            file_path: None,
        }
    }

    #[tokio::test]
    async fn test_create_exam_samples_distinct_questions() {
        let store = InMemoryExamStore::new();
        store.insert_bank(bank(5)).await;

        let exam_id = store.create_exam(1, Language::Korean, 3).await.unwrap();
        let exam = store.load_exam(exam_id).await.unwrap();

        assert_eq!(exam.question_count(), 3);
        let mut ids = exam.question_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        let questions = store.list_exam_questions(exam_id).await.unwrap();
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| !q.marked && q.correct.is_none()));
    }

    #[tokio::test]
    async fn test_create_exam_rejects_oversized_request() {
        let store = InMemoryExamStore::new();
        store.insert_bank(bank(2)).await;

        let err = store.create_exam(1, Language::English, 3).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Exam(ExamError::NotEnoughQuestions { available: 2, .. })
        ));
        assert!(store.create_exam(9, Language::English, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_submission_and_mark_are_persisted() {
        let store = InMemoryExamStore::new();
        store.insert_bank(bank(2)).await;
        let exam_id = store
            .insert_exam(1, Language::French, 7, vec![2, 1])
            .await
            .unwrap();

        store
            .save_submission(exam_id, 1, vec!["A".to_string()], true)
            .await
            .unwrap();
        store.save_mark(exam_id, 1, true).await.unwrap();

        let question = store.load_exam_question(exam_id, 1).await.unwrap();
        assert_eq!(question.question_id, 1);
        assert_eq!(question.user_answers, vec!["A".to_string()]);
        assert_eq!(question.correct, Some(true));
        assert!(question.marked);
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let store = InMemoryExamStore::new();
        assert!(matches!(
            store.load_exam(1).await.unwrap_err(),
            AppError::Exam(ExamError::ExamNotFound { exam_id: 1 })
        ));
        assert!(matches!(
            store.save_mark(1, 0, true).await.unwrap_err(),
            AppError::Exam(ExamError::QuestionNotFound { .. })
        ));
    }
}
