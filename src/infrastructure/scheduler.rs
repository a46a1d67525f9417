//! 任务调度器 - 基础设施层
//!
//! 预取需要"把一个闭包丢到后台跑，不等它"。调用方只依赖 `TaskScheduler`
//! 这个接口，不需要拿到自己的代理对象再调用自己的异步方法。

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tracing::debug;

/// 后台任务调度器
pub trait TaskScheduler: Send + Sync {
    /// 提交一个后台任务，立即返回
    fn submit(&self, task: BoxFuture<'static, ()>);
}

/// 基于 tokio 的调度器
///
/// 任务直接 spawn 到当前运行时；用 Semaphore 限制同时运行的任务数，
/// 超出的任务在后台排队，`submit` 本身从不等待。
pub struct TokioScheduler {
    permits: Arc<Semaphore>,
}

impl TokioScheduler {
    /// 创建调度器
    ///
    /// # 参数
    /// - `max_concurrent`: 同时运行的任务上限（0 按 1 处理）
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// 当前空闲的并发名额
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl TaskScheduler for TokioScheduler {
    /// 必须在 tokio 运行时内调用
    fn submit(&self, task: BoxFuture<'static, ()>) {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                debug!("调度器已关闭，丢弃后台任务");
                return;
            };
            task.await;
        });
    }
}
