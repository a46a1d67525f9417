//! 题目纯文本渲染
//!
//! 生成报告 / 对话上下文里使用的 Markdown 片段。

use std::fmt::Write;

use crate::models::QuestionView;

const NO_ANSWER: &str = "no answer";

/// 把题目视图渲染成纯文本
///
/// `correct` 为 None 表示未作答。
pub fn render_text(view: &QuestionView, correct: Option<bool>) -> String {
    let status = match correct {
        Some(true) => "correct",
        Some(false) => "incorrect",
        None => "unanswered",
    };

    let mut text = String::new();
    let _ = writeln!(text, "## Question {} ({})", view.ordinal + 1, status);
    let _ = writeln!(text, "{}", view.title);

    let _ = writeln!(text, "### Options");
    for option in &view.options {
        let _ = writeln!(text, "- {}: {}", option.key, option.value);
    }

    let _ = writeln!(text, "### Correct answers");
    let _ = writeln!(
        text,
        "{}",
        join_or_none(view.actual_answers.as_deref().unwrap_or_default())
    );

    let _ = writeln!(text, "### Selected answers");
    let _ = writeln!(text, "{}", join_or_none(&view.user_answers));

    if let Some(explanation) = &view.explanation {
        let _ = writeln!(text, "### Explanation");
        let _ = writeln!(text, "{}", explanation);
    }

    text
}

fn join_or_none(labels: &[String]) -> String {
    if labels.is_empty() {
        NO_ANSWER.to_string()
    } else {
        labels.join(", ")
    }
}
