//! 对外暴露的题目视图
//!
//! 这些结构由 `QuestionAssembler` 组装，序列化后直接交给展示层 / 报告层。

use serde::{Deserialize, Serialize};

/// 一个带标签的选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// 显示标签（A、B、C…）
    pub key: String,
    /// 译文
    pub value: String,
}

/// 题目视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// 题目序号（从 0 开始）
    pub ordinal: u64,
    pub title: String,
    /// 正确选项个数（提示单选 / 多选）
    pub answer_count: usize,
    pub options: Vec<QuestionOption>,
    pub marked: bool,
    /// 已提交的标签，未作答时为空
    pub user_answers: Vec<String>,
    /// 正确选项标签，只在作答后出现
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_answers: Option<Vec<String>>,
    /// 解析译文，只在作答后出现
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// 作答结果，未作答时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

impl QuestionView {
    /// 正确答案和解析是否已经公开
    pub fn is_revealed(&self) -> bool {
        self.actual_answers.is_some()
    }
}

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub correct: bool,
    pub actual_answers: Vec<String>,
    pub explanation: Option<String>,
}

/// 考试结果汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub total_questions: u64,
    pub correct_questions: u64,
    pub marked: Vec<QuestionView>,
    /// 答错或未作答的题目
    pub incorrect: Vec<QuestionView>,
}
