//! 预取 - 业务能力层
//!
//! 访问第 N 题时，把 N+1 … N+K 题的翻译提前丢到后台。
//! 没有条目的键先在缓存里预约（立即可见为进行中），再把驱动它的任务交给
//! 调度器；任务排队期间再次访问不会重复提交。

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::infrastructure::TaskScheduler;
use crate::models::{ExamId, TranslationKey, TranslationRecord};
use crate::services::exam_translator::QuestionTranslator;
use crate::services::single_flight::SingleFlightCache;

/// 题目翻译缓存
pub type TranslationCache = SingleFlightCache<TranslationKey, TranslationRecord>;

pub struct Prefetcher {
    cache: Arc<TranslationCache>,
    translator: Arc<dyn QuestionTranslator>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl Prefetcher {
    pub fn new(
        cache: Arc<TranslationCache>,
        translator: Arc<dyn QuestionTranslator>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            cache,
            translator,
            scheduler,
        }
    }

    /// 访问第 `ordinal` 题后调用，不等待任何翻译
    ///
    /// 返回本次实际提交的后台任务数。
    pub fn on_access(&self, exam_id: ExamId, ordinal: u64, lookahead: u64) -> usize {
        let mut submitted = 0;
        for offset in 1..=lookahead {
            let Some(next) = ordinal.checked_add(offset) else {
                break;
            };
            let key = TranslationKey::new(exam_id, next);

            // 检查和登记在同一把锁里完成：排队等调度的任务也算进行中
            let translator = Arc::clone(&self.translator);
            let Some(computation) = self
                .cache
                .reserve(key, move || async move { translator.translate(key).await })
            else {
                continue;
            };

            self.scheduler.submit(
                async move {
                    match computation.await {
                        Ok(_) => debug!("预取完成 {}", key),
                        Err(e) => warn!("⚠️ 预取失败 {}: {}", key, e),
                    }
                }
                .boxed(),
            );
            submitted += 1;
        }

        if submitted > 0 {
            debug!(
                "🔮 考试 #{} 第 {} 题: 提交 {} 个预取任务",
                exam_id, ordinal, submitted
            );
        }
        submitted
    }
}
