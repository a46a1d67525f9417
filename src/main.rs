use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use exam_translation::models::load_all_question_banks;
use exam_translation::utils::logging;
use exam_translation::{render_text, Config, InMemoryExamStore, LlmOracle, QuestionAssembler};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let banks = load_all_question_banks(&config.question_bank_folder)
        .await
        .with_context(|| format!("读取题库目录失败: {}", config.question_bank_folder))?;
    let Some(bank_id) = banks.first().map(|b| b.id) else {
        warn!("⚠️ 题库目录 {} 中没有可用的题库", config.question_bank_folder);
        return Ok(());
    };

    let store = Arc::new(InMemoryExamStore::new());
    for bank in banks {
        store.insert_bank(bank).await;
    }

    let exam_id = store
        .create_exam(bank_id, config.exam_language, config.exam_question_count)
        .await
        .context("创建考试失败")?;

    let assembler = QuestionAssembler::new(&config, store, Arc::new(LlmOracle::new(&config)));
    let count = assembler.question_count(exam_id).await?;
    info!("📚 考试 #{} 共 {} 题", exam_id, count);

    for ordinal in 0..count {
        match assembler.present(exam_id, ordinal).await {
            Ok(view) => println!("{}", render_text(&view, view.correct)),
            Err(e) => {
                error!("❌ 第 {} 题展示失败: {}", ordinal + 1, e);
                if !e.is_retryable() {
                    return Err(e.into());
                }
            }
        }
    }

    info!("✅ 全部题目展示完毕");
    Ok(())
}
