// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::models::fetch_request::FetchRequest;

/// 队列错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// 队列已关闭
    #[error("Queue closed")]
    Closed,
}

/// URL队列特质
///
/// 工作者池共享的待抓取请求队列
#[async_trait]
pub trait UrlQueue: Send + Sync {
    /// 入队请求
    async fn enqueue(&self, request: FetchRequest) -> Result<(), QueueError>;

    /// 出队请求，队列为空时返回 None
    async fn dequeue(&self) -> Result<Option<FetchRequest>, QueueError>;

    /// 取出所有剩余请求
    async fn drain(&self) -> Vec<FetchRequest>;

    /// 剩余请求数量
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// 内存队列实现
#[derive(Default)]
pub struct InMemoryUrlQueue {
    inner: Mutex<VecDeque<FetchRequest>>,
    closed: Mutex<bool>,
}

impl InMemoryUrlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 关闭队列，之后的入队请求会被拒绝
    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

#[async_trait]
impl UrlQueue for InMemoryUrlQueue {
    async fn enqueue(&self, request: FetchRequest) -> Result<(), QueueError> {
        if *self.closed.lock() {
            return Err(QueueError::Closed);
        }
        self.inner.lock().push_back(request);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<FetchRequest>, QueueError> {
        Ok(self.inner.lock().pop_front())
    }

    async fn drain(&self) -> Vec<FetchRequest> {
        self.inner.lock().drain(..).collect()
    }

    async fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[async_trait]
impl<T: UrlQueue + ?Sized> UrlQueue for Arc<T> {
    async fn enqueue(&self, request: FetchRequest) -> Result<(), QueueError> {
        (**self).enqueue(request).await
    }

    async fn dequeue(&self) -> Result<Option<FetchRequest>, QueueError> {
        (**self).dequeue().await
    }

    async fn drain(&self) -> Vec<FetchRequest> {
        (**self).drain().await
    }

    async fn len(&self) -> usize {
        (**self).len().await
    }
}
