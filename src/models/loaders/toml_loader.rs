use crate::models::exam::QuestionBank;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载题库
pub async fn load_question_bank(toml_file_path: &Path) -> Result<QuestionBank> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut bank: QuestionBank = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    validate_bank(&bank)
        .with_context(|| format!("题库内容无效: {}", toml_file_path.display()))?;

    bank.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(bank)
}

/// 从文件夹中加载所有题库，单个文件失败只记录警告
pub async fn load_all_question_banks(folder_path: &str) -> Result<Vec<QuestionBank>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut banks = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_question_bank(&path).await {
                Ok(bank) => {
                    tracing::info!("成功加载题库 {} ({} 道题)", bank.name, bank.questions.len());
                    banks.push(bank);
                }
                Err(e) => {
                    tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
                }
            }
        }
    }

    banks.sort_by_key(|b| b.id);
    Ok(banks)
}

/// 题目 id、选项 id 不能重复，每道题至少一个正确选项
fn validate_bank(bank: &QuestionBank) -> Result<()> {
    let mut question_ids = HashSet::new();
    for question in &bank.questions {
        if !question_ids.insert(question.id) {
            anyhow::bail!("题目 id 重复: {}", question.id);
        }
        let mut answer_ids = HashSet::new();
        for answer in &question.answers {
            if !answer_ids.insert(answer.id) {
                anyhow::bail!("题目 {} 的选项 id 重复: {}", question.id, answer.id);
            }
        }
        if !question.answers.iter().any(|a| a.correct) {
            anyhow::bail!("题目 {} 没有正确选项", question.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"
id = 1
name = "Geography"

[[questions]]
id = 10
title = "Capital of France?"
explanation = "Paris has been the capital since 987."

[[questions.answers]]
id = 1
text = "Paris"
correct = true

[[questions.answers]]
id = 2
text = "Lyon"
"#;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "exam_translation_{}_{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_load_question_bank() {
        let dir = temp_dir("single");
        let path = dir.join("geo.toml");
        std::fs::write(&path, BANK).unwrap();

        let bank = load_question_bank(&path).await.unwrap();
        assert_eq!(bank.name, "Geography");
        assert_eq!(bank.questions.len(), 1);
        assert_eq!(bank.questions[0].answers.len(), 2);
        assert_eq!(bank.file_path.as_deref(), Some(path.to_string_lossy().as_ref()));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_load_all_skips_broken_files() {
        let dir = temp_dir("folder");
        std::fs::write(dir.join("good.toml"), BANK).unwrap();
        std::fs::write(dir.join("broken.toml"), "id = \"not a number\"").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let banks = load_all_question_banks(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].id, 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        assert!(load_all_question_banks("/definitely/not/here").await.is_err());
    }

    #[test]
    fn test_validate_rejects_question_without_correct_answer() {
        let mut bank: QuestionBank = toml::from_str(BANK).unwrap();
        bank.questions[0].answers[0].correct = false;
        assert!(validate_bank(&bank).is_err());
    }
}
