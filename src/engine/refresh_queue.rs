// ==========================================
// 轮岗人员调配系统 - 汇总缓存回写队列
// ==========================================
// 职责: 后台回写分院当日汇总（write-behind）
// 规则: 单 worker 串行写入; 同一 (分院, 日期) 的待写请求合并，保留最新结果
// 红线: 回写失败只记录日志与统计，不影响调用方已返回的结果
// ==========================================

use crate::domain::BranchQuotaStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::contracts::SummaryCache;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

type SummaryKey = (i64, NaiveDate);

/// 队列统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted_count: u64,
    pub coalesced_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub pending_count: u64,
}

#[derive(Default)]
struct QueueInner {
    pending: HashMap<SummaryKey, BranchQuotaStatus>,
    in_flight: usize,
    stats: QueueStats,
}

impl QueueInner {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

struct QueueShared {
    inner: Mutex<QueueInner>,
    idle: Notify,
}

impl QueueShared {
    fn lock(&self) -> EngineResult<std::sync::MutexGuard<'_, QueueInner>> {
        self.inner
            .lock()
            .map_err(|e| EngineError::Other(anyhow::anyhow!("刷新队列锁获取失败: {}", e)))
    }
}

enum QueueMessage {
    Refresh(SummaryKey),
    Shutdown,
}

// ==========================================
// SummaryRefreshQueue - 汇总回写队列
// ==========================================
pub struct SummaryRefreshQueue {
    sender: mpsc::UnboundedSender<QueueMessage>,
    shared: Arc<QueueShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SummaryRefreshQueue {
    /// 启动回写队列（需在 tokio 运行时内调用）
    pub fn start<C>(cache: Arc<C>) -> EngineResult<Self>
    where
        C: SummaryCache + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::Other(anyhow::anyhow!("刷新队列需要 tokio 运行时: {}", e)))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(QueueShared {
            inner: Mutex::new(QueueInner::default()),
            idle: Notify::new(),
        });

        let worker = handle.spawn(run_worker(cache, receiver, shared.clone()));
        tracing::info!("汇总回写队列已启动");

        Ok(Self {
            sender,
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// 提交一份完整汇总
    ///
    /// 同一 (分院, 日期) 尚未写入时直接覆盖待写结果，计入 coalesced
    pub fn submit(&self, status: BranchQuotaStatus) -> EngineResult<()> {
        let key = (status.branch_id, status.status_date);
        let is_new = {
            let mut inner = self.shared.lock()?;
            inner.stats.submitted_count += 1;
            let is_new = inner.pending.insert(key, status).is_none();
            if !is_new {
                inner.stats.coalesced_count += 1;
            }
            inner.stats.pending_count = inner.pending.len() as u64;
            is_new
        };

        if is_new {
            self.sender.send(QueueMessage::Refresh(key)).map_err(|_| {
                EngineError::Other(anyhow::anyhow!("刷新队列已关闭: branch_id={}", key.0))
            })?;
        }
        Ok(())
    }

    /// 当前统计
    pub fn stats(&self) -> EngineResult<QueueStats> {
        Ok(self.shared.lock()?.stats.clone())
    }

    /// 等待所有已提交请求处理完毕
    pub async fn wait_idle(&self) -> EngineResult<()> {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.lock()?.is_idle() {
                return Ok(());
            }
            if self.worker_finished()? {
                return Ok(());
            }
            notified.await;
        }
    }

    fn worker_finished(&self) -> EngineResult<bool> {
        let worker = self
            .worker
            .lock()
            .map_err(|e| EngineError::Other(anyhow::anyhow!("刷新队列锁获取失败: {}", e)))?;
        Ok(worker.as_ref().map_or(true, |w| w.is_finished()))
    }

    /// 处理完剩余请求后停止 worker
    pub async fn shutdown(&self) -> EngineResult<()> {
        let worker = self
            .worker
            .lock()
            .map_err(|e| EngineError::Other(anyhow::anyhow!("刷新队列锁获取失败: {}", e)))?
            .take();

        let Some(worker) = worker else {
            return Ok(());
        };
        // worker 已退出时发送失败可忽略
        let _ = self.sender.send(QueueMessage::Shutdown);
        worker
            .await
            .map_err(|e| EngineError::Other(anyhow::anyhow!("刷新队列 worker 异常退出: {}", e)))?;

        let stats = self.stats()?;
        tracing::info!(
            submitted = stats.submitted_count,
            coalesced = stats.coalesced_count,
            completed = stats.completed_count,
            failed = stats.failed_count,
            "汇总回写队列已停止"
        );
        Ok(())
    }
}

async fn run_worker<C>(
    cache: Arc<C>,
    mut receiver: mpsc::UnboundedReceiver<QueueMessage>,
    shared: Arc<QueueShared>,
) where
    C: SummaryCache + 'static,
{
    while let Some(message) = receiver.recv().await {
        let key = match message {
            QueueMessage::Refresh(key) => key,
            QueueMessage::Shutdown => break,
        };

        // 取出即出队；写入期间同 key 的新提交会作为新请求重新排队
        let status = match shared.lock() {
            Ok(mut inner) => {
                let status = inner.pending.remove(&key);
                if status.is_some() {
                    inner.in_flight += 1;
                }
                inner.stats.pending_count = inner.pending.len() as u64;
                status
            }
            Err(e) => {
                tracing::error!(error = %e, "刷新队列状态不可用，worker 退出");
                break;
            }
        };
        let Some(status) = status else {
            continue;
        };
        let revision = status.data_revision;

        let writer = cache.clone();
        let result = tokio::task::spawn_blocking(move || writer.store_summary(&status)).await;

        let Ok(mut inner) = shared.lock() else {
            tracing::error!("刷新队列状态不可用，worker 退出");
            break;
        };
        inner.in_flight = inner.in_flight.saturating_sub(1);
        match result {
            Ok(Ok(())) => {
                inner.stats.completed_count += 1;
                tracing::debug!(branch_id = key.0, date = %key.1, revision, "汇总已回写");
            }
            Ok(Err(e)) => {
                inner.stats.failed_count += 1;
                tracing::error!(branch_id = key.0, date = %key.1, revision, error = %e, "汇总回写失败");
            }
            Err(e) => {
                inner.stats.failed_count += 1;
                tracing::error!(branch_id = key.0, date = %key.1, revision, error = %e, "汇总回写任务异常");
            }
        }
        let idle = inner.is_idle();
        drop(inner);

        if idle {
            shared.idle.notify_waiters();
        }
    }

    // 退出时唤醒等待者，避免 wait_idle 永久阻塞
    shared.idle.notify_waiters();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use chrono::NaiveDateTime;

    #[derive(Default)]
    struct MemoryCache {
        stored: Mutex<Vec<(i64, NaiveDate, i64)>>,
        fail_branch: Option<i64>,
    }

    impl SummaryCache for MemoryCache {
        fn load_summary(
            &self,
            _branch_id: i64,
            _date: NaiveDate,
            _revision: i64,
        ) -> RepositoryResult<Option<BranchQuotaStatus>> {
            Ok(None)
        }

        fn store_summary(&self, status: &BranchQuotaStatus) -> RepositoryResult<()> {
            if self.fail_branch == Some(status.branch_id) {
                return Err(RepositoryError::DatabaseQueryError("disk full".to_string()));
            }
            self.stored
                .lock()
                .unwrap()
                .push((status.branch_id, status.status_date, status.data_revision));
            Ok(())
        }
    }

    fn status(branch_id: i64, revision: i64) -> BranchQuotaStatus {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        BranchQuotaStatus::closed(
            branch_id,
            format!("BR-{}", branch_id),
            "测试分院".to_string(),
            date,
            revision,
            NaiveDateTime::default(),
        )
    }

    #[tokio::test]
    async fn test_pending_writes_are_coalesced() {
        let cache = Arc::new(MemoryCache::default());
        let queue = SummaryRefreshQueue::start(cache.clone()).unwrap();

        // current_thread 运行时: worker 在首次 await 之前不会执行
        queue.submit(status(1, 1)).unwrap();
        queue.submit(status(1, 2)).unwrap();
        queue.submit(status(2, 1)).unwrap();
        queue.wait_idle().await.unwrap();

        let stats = queue.stats().unwrap();
        assert_eq!(stats.submitted_count, 3);
        assert_eq!(stats.coalesced_count, 1);
        assert_eq!(stats.completed_count, 2);
        assert_eq!(stats.failed_count, 0);
        assert_eq!(stats.pending_count, 0);

        let stored = cache.stored.lock().unwrap().clone();
        assert_eq!(stored.len(), 2);
        assert!(stored.contains(&(1, status(1, 2).status_date, 2)));
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let cache = Arc::new(MemoryCache {
            stored: Mutex::new(Vec::new()),
            fail_branch: Some(9),
        });
        let queue = SummaryRefreshQueue::start(cache.clone()).unwrap();

        queue.submit(status(9, 1)).unwrap();
        queue.submit(status(3, 1)).unwrap();
        queue.wait_idle().await.unwrap();

        let stats = queue.stats().unwrap();
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.completed_count, 1);
        queue.shutdown().await.unwrap();
    }

    #[test]
    fn test_start_requires_runtime() {
        let cache = Arc::new(MemoryCache::default());
        assert!(SummaryRefreshQueue::start(cache).is_err());
    }
}
