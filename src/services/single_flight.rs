//! 单飞缓存 - 业务能力层
//!
//! 每个键同一时间最多只有一个计算在跑：
//!
//! - `Ready`：直接返回，不再计算
//! - `Pending`：附着到正在进行的计算上，等它的结果
//! - 不存在：登记 `Pending`，调用一次 `compute`，成功后转为 `Ready`，
//!   失败则把整个条目删掉（不缓存失败），下一次请求从头重试
//!
//! `get_or_compute` 发起的计算被 spawn 到 tokio 上独立运行，调用方放弃等待也
//! 不会取消它；`reserve` 只登记不运行，由调用方决定何时驱动（预取用它排队）。
//! 状态转换在唤醒等待者之前完成，所以等待者醒来时条目已经是终态。

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

type SharedOutcome<V> = Shared<BoxFuture<'static, AppResult<Arc<V>>>>;

enum Slot<V> {
    Pending(SharedOutcome<V>),
    Ready(Arc<V>),
}

type Slots<K, V> = Arc<Mutex<HashMap<K, Slot<V>>>>;

/// 单飞缓存
pub struct SingleFlightCache<K, V> {
    slots: Slots<K, V>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 取缓存值，没有就计算
    ///
    /// `compute` 在持锁状态下被调用，只应构造 future，不要在里面做实际工作。
    ///
    /// # 返回
    /// - 成功：所有调用方拿到同一个 `Arc`
    /// - 失败：发起计算的调用方拿到原始错误；附着的调用方拿到
    ///   `ConcurrentComputationFailed`，其中带着同一个原因
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> AppResult<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>> + Send + 'static,
    {
        let (outcome, is_leader) = {
            let mut slots = lock(&self.slots);
            match slots.get(&key) {
                Some(Slot::Ready(value)) => {
                    debug!("命中缓存 {}", key);
                    return Ok(Arc::clone(value));
                }
                Some(Slot::Pending(outcome)) => {
                    debug!("附着到进行中的计算 {}", key);
                    (outcome.clone(), false)
                }
                None => {
                    debug!("开始计算 {}", key);
                    let outcome = self.register(&mut slots, key.clone(), compute());
                    // 独立驱动，调用方放弃等待也会跑完
                    tokio::spawn(outcome.clone().map(|_| ()));
                    (outcome, true)
                }
            }
        };

        match outcome.await {
            Ok(value) => Ok(value),
            Err(cause) if is_leader => Err(cause),
            Err(cause) => Err(AppError::ConcurrentComputationFailed {
                key: key.to_string(),
                cause: Arc::new(cause),
            }),
        }
    }

    /// 预约一个计算：键没有条目时立即登记 `Pending`，但计算要等返回的
    /// future 被驱动才开始
    ///
    /// 键已有条目（进行中或已完成）时返回 `None`，`compute` 不会被调用。
    /// 在预约的计算开始前附着上来的调用方会自己驱动它，不会卡住。
    pub fn reserve<F, Fut>(&self, key: K, compute: F) -> Option<BoxFuture<'static, AppResult<Arc<V>>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>> + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        if slots.contains_key(&key) {
            return None;
        }
        debug!("预约计算 {}", key);
        Some(self.register(&mut slots, key, compute()).boxed())
    }

    /// 登记 `Pending`，返回可共享的结果句柄
    ///
    /// 句柄第一次被 poll 时才开始计算；计算结束后先完成状态转换再唤醒等待者。
    fn register<Fut>(
        &self,
        slots: &mut HashMap<K, Slot<V>>,
        key: K,
        computation: Fut,
    ) -> SharedOutcome<V>
    where
        Fut: Future<Output = AppResult<V>> + Send + 'static,
    {
        let shared_slots = Arc::clone(&self.slots);
        let task_key = key.clone();
        let outcome = async move {
            let outcome = match AssertUnwindSafe(computation).catch_unwind().await {
                Ok(result) => result.map(Arc::new),
                Err(_) => Err(AppError::ComputationPanicked {
                    key: task_key.to_string(),
                }),
            };
            settle(&shared_slots, task_key, &outcome);
            outcome
        }
        .boxed()
        .shared();

        slots.insert(key, Slot::Pending(outcome.clone()));
        outcome
    }

    /// 键是否已有条目（进行中或已完成）
    pub fn contains(&self, key: &K) -> bool {
        lock(&self.slots).contains_key(key)
    }

    /// 键是否已经算好
    pub fn is_ready(&self, key: &K) -> bool {
        matches!(lock(&self.slots).get(key), Some(Slot::Ready(_)))
    }

    /// 不触发计算，只看已完成的值
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        match lock(&self.slots).get(key) {
            Some(Slot::Ready(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// 条目数（进行中 + 已完成）
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// 计算结束后的状态转换：成功 → Ready，失败 → 删除
fn settle<K, V>(slots: &Mutex<HashMap<K, Slot<V>>>, key: K, outcome: &AppResult<Arc<V>>)
where
    K: Eq + Hash + Display,
{
    let mut slots = lock(slots);
    match outcome {
        Ok(value) => {
            info!("✓ 已缓存 {}", key);
            slots.insert(key, Slot::Ready(Arc::clone(value)));
        }
        Err(e) => {
            warn!("⚠️ 计算失败，移除占位 {}: {}", key, e);
            slots.remove(&key);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    type Cache = SingleFlightCache<u64, String>;

    fn timeout_error() -> AppError {
        AppError::Oracle(OracleError::Timeout { timeout_secs: 30 })
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = Arc::new(Cache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(7, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("seven".to_string())
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(assert_ok!(handle.await.unwrap()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(results[0].as_str(), "seven");
        assert!(cache.is_ready(&7));
    }

    #[tokio::test]
    async fn test_ready_entry_skips_compute() {
        let cache = Cache::new();
        assert_ok!(cache.get_or_compute(1, || async { Ok("one".to_string()) }).await);

        let calls = AtomicUsize::new(0);
        let value = assert_ok!(
            cache
                .get_or_compute(1, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok("other".to_string()) }
                })
                .await
        );

        assert_eq!(value.as_str(), "one");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.peek(&1).as_deref().map(String::as_str), Some("one"));
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first_calls = Arc::clone(&calls);
        let err = assert_err!(
            cache
                .get_or_compute(3, move || async move {
                    first_calls.fetch_add(1, Ordering::SeqCst);
                    Err(timeout_error())
                })
                .await
        );
        assert!(matches!(err, AppError::Oracle(OracleError::Timeout { .. })));
        assert!(!cache.contains(&3));

        let second_calls = Arc::clone(&calls);
        let value = assert_ok!(
            cache
                .get_or_compute(3, move || async move {
                    second_calls.fetch_add(1, Ordering::SeqCst);
                    Ok("three".to_string())
                })
                .await
        );

        assert_eq!(value.as_str(), "three");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_receive_concurrent_failure() {
        let cache = Arc::new(Cache::new());
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute(5, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Err(timeout_error())
                    })
                    .await
            })
        };
        wait_until(|| cache.contains(&5)).await;

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            waiters.push(tokio::spawn(async move {
                cache
                    .get_or_compute(5, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("should not run".to_string())
                    })
                    .await
            }));
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        gate.notify_one();

        let leader_err = assert_err!(leader.await.unwrap());
        assert!(matches!(leader_err, AppError::Oracle(OracleError::Timeout { .. })));

        for waiter in waiters {
            let err = assert_err!(waiter.await.unwrap());
            match err {
                AppError::ConcurrentComputationFailed { key, cause } => {
                    assert_eq!(key, "5");
                    assert!(matches!(*cause, AppError::Oracle(OracleError::Timeout { .. })));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.contains(&5));
    }

    #[tokio::test]
    async fn test_panicking_compute_unwinds_and_retries() {
        let cache = Cache::new();

        let err = assert_err!(
            cache
                .get_or_compute(9, || async {
                    if true {
                        panic!("boom");
                    }
                    Ok("never".to_string())
                })
                .await
        );
        assert!(matches!(err, AppError::ComputationPanicked { .. }));
        assert!(err.is_retryable());
        assert!(cache.is_empty());

        let value = assert_ok!(cache.get_or_compute(9, || async { Ok("nine".to_string()) }).await);
        assert_eq!(value.as_str(), "nine");
    }

    #[tokio::test]
    async fn test_computation_outlives_abandoned_caller() {
        let cache = Cache::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute(4, || async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok("four".to_string())
            }),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(cache.contains(&4));

        wait_until(|| cache.is_ready(&4)).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_compute_independently() {
        let cache = Cache::new();
        for key in 0..5u64 {
            let value = assert_ok!(
                cache
                    .get_or_compute(key, move || async move { Ok(format!("v{key}")) })
                    .await
            );
            assert_eq!(*value, format!("v{key}"));
        }
        assert_eq!(cache.len(), 5);
    }

    #[tokio::test]
    async fn test_reserve_registers_pending_without_running() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let reserved = cache.reserve(2, move || async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok("two".to_string())
        });
        let Some(reserved) = reserved else {
            panic!("empty key should be reserved");
        };

        assert!(cache.contains(&2));
        assert!(!cache.is_ready(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // 已有条目时不再预约，也不调用 compute
        assert!(cache
            .reserve(2, || async { Ok("again".to_string()) })
            .is_none());

        let value = assert_ok!(reserved.await);
        assert_eq!(value.as_str(), "two");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_ready(&2));
        assert!(cache
            .reserve(2, || async { Ok("again".to_string()) })
            .is_none());
    }

    #[tokio::test]
    async fn test_caller_drives_reserved_computation() {
        let cache = Cache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let reserved = cache.reserve(8, move || async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok("eight".to_string())
        });
        assert!(reserved.is_some());

        // 预约的 future 从未被驱动，附着的调用方自己把它跑完
        let value = assert_ok!(
            cache
                .get_or_compute(8, || async { Ok("other".to_string()) })
                .await
        );
        assert_eq!(value.as_str(), "eight");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(reserved);
        assert!(cache.is_ready(&8));
    }

    #[tokio::test]
    async fn test_failed_reservation_is_removed() {
        let cache = Cache::new();
        let reserved = cache.reserve(6, || async { Err(timeout_error()) });
        let Some(reserved) = reserved else {
            panic!("empty key should be reserved");
        };

        let err = assert_err!(reserved.await);
        assert!(matches!(err, AppError::Oracle(OracleError::Timeout { .. })));
        assert!(!cache.contains(&6));
    }
}
