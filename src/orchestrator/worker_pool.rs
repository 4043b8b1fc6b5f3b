//! 固定大小工作池 - 编排层
//!
//! 所有工作线程从同一个队列领取 `(下标, 任务)`，结果通过通道交给唯一的汇总者，
//! 汇总者按下标写入预分配的结果槽。完成顺序无关紧要，输出顺序只由下标决定。

use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// 工作池
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 处理全部任务，返回与输入等长、按输入顺序排列的结果
    ///
    /// 某个任务 panic 时只有它的槽位为 `None`，其余任务照常完成
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<Option<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(usize, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let total = items.len();
        let queue = Arc::new(Mutex::new(
            items.into_iter().enumerate().collect::<VecDeque<_>>(),
        ));
        let work = Arc::new(work);
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, R)>();

        let mut handles = Vec::new();
        for worker in 0..self.workers.min(total) {
            let queue = queue.clone();
            let work = work.clone();
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    // 队列为空即退出，锁不跨越 await
                    let next = queue.lock().await.pop_front();
                    let Some((index, item)) = next else {
                        break;
                    };

                    match AssertUnwindSafe(work(index, item)).catch_unwind().await {
                        Ok(result) => {
                            if tx.send((index, result)).is_err() {
                                break;
                            }
                        }
                        Err(_) => error!("[订单 {}] ❌ 处理过程中发生 panic", index + 1),
                    }
                }
                debug!("工作线程 {} 退出", worker);
            }));
        }
        drop(tx);

        let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();
        while let Some((index, result)) = rx.recv().await {
            if let Some(slot) = results.get_mut(index) {
                *slot = Some(result);
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("工作线程执行失败: {}", e);
            }
        }

        results
    }
}
