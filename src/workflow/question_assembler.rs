//! 题目组装 - 流程层
//!
//! 核心职责：把"一场考试的第 N 题"组装成展示用的视图，并处理作答。
//!
//! `present` 的流程：
//! 1. 读出考试、题目状态、原始选项
//! 2. 用考试种子 + 序号确定选项顺序
//! 3. 把后面 K 题的翻译丢给预取（不等待）
//! 4. 等待本题翻译（单飞缓存，唯一的阻塞点）
//! 5. 合并作答状态，生成视图；只有作答后才公开正确答案和解析

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use crate::clients::TranslationOracle;
use crate::config::Config;
use crate::error::{AppError, AppResult, ExamError};
use crate::infrastructure::{ExamStore, TaskScheduler, TokioScheduler};
use crate::models::{
    Answer, AnswerId, Exam, ExamId, ExamQuestion, ExamResult, QuestionOption, QuestionView,
    SubmissionOutcome, TranslationKey, TranslationRecord,
};
use crate::services::permutation;
use crate::services::{ExamTranslator, Prefetcher, QuestionTranslator, TranslationCache};

/// 题目组装器
///
/// - 持有翻译缓存，缓存生命周期与组装器一致
/// - 不直接调用翻译服务，只通过缓存 / 预取间接使用
pub struct QuestionAssembler {
    store: Arc<dyn ExamStore>,
    cache: Arc<TranslationCache>,
    translator: Arc<dyn QuestionTranslator>,
    prefetcher: Prefetcher,
    lookahead: u64,
}

impl QuestionAssembler {
    /// 按配置组装完整的依赖
    pub fn new(
        config: &Config,
        store: Arc<dyn ExamStore>,
        oracle: Arc<dyn TranslationOracle>,
    ) -> Self {
        let translator: Arc<dyn QuestionTranslator> = Arc::new(ExamTranslator::new(
            Arc::clone(&store),
            oracle,
            config.translation_mode,
        ));
        let scheduler: Arc<dyn TaskScheduler> =
            Arc::new(TokioScheduler::new(config.max_concurrent_prefetch));
        Self::from_parts(store, translator, scheduler, config.prediction_count)
    }

    pub fn from_parts(
        store: Arc<dyn ExamStore>,
        translator: Arc<dyn QuestionTranslator>,
        scheduler: Arc<dyn TaskScheduler>,
        lookahead: u64,
    ) -> Self {
        let cache = Arc::new(TranslationCache::new());
        let prefetcher = Prefetcher::new(Arc::clone(&cache), Arc::clone(&translator), scheduler);
        Self {
            store,
            cache,
            translator,
            prefetcher,
            lookahead,
        }
    }

    /// 翻译缓存（只读查看用）
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// 展示第 `ordinal` 题
    pub async fn present(&self, exam_id: ExamId, ordinal: u64) -> AppResult<QuestionView> {
        let exam = self.store.load_exam(exam_id).await?;
        let exam_question = self.store.load_exam_question(exam_id, ordinal).await?;

        self.prefetcher
            .on_access(exam_id, ordinal, self.window(&exam, ordinal));

        self.view_of(&exam, &exam_question).await
    }

    /// 提交答案
    ///
    /// 重复提交会覆盖上一次的结果。
    pub async fn submit(
        &self,
        exam_id: ExamId,
        ordinal: u64,
        labels: &[String],
    ) -> AppResult<SubmissionOutcome> {
        if labels.is_empty() {
            return Err(ExamError::EmptySubmission.into());
        }

        let exam = self.store.load_exam(exam_id).await?;
        let exam_question = self.store.load_exam_question(exam_id, ordinal).await?;
        let answers = self.store.load_answers(exam_question.question_id).await?;
        let order = permutation::shuffle(exam.seed, ordinal, &answers);

        let selected = permutation::resolve_labels(&order, labels)?;
        let expected: HashSet<AnswerId> =
            order.iter().filter(|a| a.correct).map(|a| a.id).collect();
        let correct = selected == expected;

        // 先拿到译文：翻译失败时不留下作答记录
        let translation = self.translation(TranslationKey::new(exam_id, ordinal)).await?;

        self.store
            .save_submission(exam_id, ordinal, canonical_labels(&order, &selected), correct)
            .await?;
        info!(
            "📝 考试 #{} 第 {} 题提交 {:?}: {}",
            exam_id,
            ordinal,
            labels,
            if correct { "✓ 正确" } else { "✗ 错误" }
        );

        Ok(SubmissionOutcome {
            correct,
            actual_answers: permutation::correct_labels(&order),
            explanation: translation.explanation.clone(),
        })
    }

    pub async fn mark(&self, exam_id: ExamId, ordinal: u64) -> AppResult<()> {
        self.store.save_mark(exam_id, ordinal, true).await?;
        info!("🔖 考试 #{} 第 {} 题已标记", exam_id, ordinal);
        Ok(())
    }

    pub async fn unmark(&self, exam_id: ExamId, ordinal: u64) -> AppResult<()> {
        self.store.save_mark(exam_id, ordinal, false).await?;
        info!("考试 #{} 第 {} 题取消标记", exam_id, ordinal);
        Ok(())
    }

    pub async fn question_count(&self, exam_id: ExamId) -> AppResult<u64> {
        self.store.question_count(exam_id).await
    }

    /// 考试结果：总题数、答对题数、标记的题和答错（含未作答）的题
    pub async fn result(&self, exam_id: ExamId) -> AppResult<ExamResult> {
        let exam = self.store.load_exam(exam_id).await?;
        let questions = self.store.list_exam_questions(exam_id).await?;

        let views = try_join_all(questions.iter().map(|q| self.view_of(&exam, q))).await?;

        let total_questions = views.len() as u64;
        let correct_questions = views.iter().filter(|v| v.correct == Some(true)).count() as u64;
        let marked = views.iter().filter(|v| v.marked).cloned().collect();
        let incorrect = views
            .into_iter()
            .filter(|v| v.correct != Some(true))
            .collect();

        info!(
            "📊 考试 #{} 结果: {}/{} 正确",
            exam_id, correct_questions, total_questions
        );
        Ok(ExamResult {
            total_questions,
            correct_questions,
            marked,
            incorrect,
        })
    }

    /// 预取窗口，截断到最后一题
    fn window(&self, exam: &Exam, ordinal: u64) -> u64 {
        let last = exam.question_count().saturating_sub(1);
        last.saturating_sub(ordinal).min(self.lookahead)
    }

    async fn translation(&self, key: TranslationKey) -> AppResult<Arc<TranslationRecord>> {
        let translator = Arc::clone(&self.translator);
        self.cache
            .get_or_compute(key, move || async move { translator.translate(key).await })
            .await
    }

    async fn view_of(&self, exam: &Exam, exam_question: &ExamQuestion) -> AppResult<QuestionView> {
        let answers = self.store.load_answers(exam_question.question_id).await?;
        let order = permutation::shuffle(exam.seed, exam_question.no, &answers);
        let translation = self
            .translation(TranslationKey::new(exam.id, exam_question.no))
            .await?;
        build_view(exam_question, &order, &translation)
    }
}

fn build_view(
    exam_question: &ExamQuestion,
    order: &[Answer],
    translation: &TranslationRecord,
) -> AppResult<QuestionView> {
    let options = order
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            let value = translation.answers.get(&answer.id).cloned().ok_or_else(|| {
                AppError::schema_violation(format!("缺少选项 {} 的译文", answer.id))
            })?;
            Ok(QuestionOption {
                key: permutation::label_for(i),
                value,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let revealed = exam_question.is_answered();
    Ok(QuestionView {
        ordinal: exam_question.no,
        title: translation.title.clone(),
        answer_count: order.iter().filter(|a| a.correct).count(),
        options,
        marked: exam_question.marked,
        user_answers: if revealed {
            exam_question.user_answers.clone()
        } else {
            Vec::new()
        },
        actual_answers: revealed.then(|| permutation::correct_labels(order)),
        explanation: if revealed {
            translation.explanation.clone()
        } else {
            None
        },
        correct: if revealed { exam_question.correct } else { None },
    })
}

/// 按展示顺序重新生成标签（去重、去空白）
fn canonical_labels(order: &[Answer], selected: &HashSet<AnswerId>) -> Vec<String> {
    order
        .iter()
        .enumerate()
        .filter(|(_, a)| selected.contains(&a.id))
        .map(|(i, _)| permutation::label_for(i))
        .collect()
}
