// 数据库管理器 - 持有存储后端、读写闸门和事件总线
//
// 所有写操作（包括写之前的存在性检查）都持有闸门的写端，读操作持有读端：
// 读与读可以并发，读与写、写与写互斥

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use super::config::StorageConfig;
use super::error::StoreResult;
use super::repository::sqlite::SqliteRepository;
use super::repository::TrackerBackend;
use crate::event_bus::{EventBus, StoreEvent};

/// 数据库管理器
pub struct Database {
    backend: Arc<dyn TrackerBackend>,
    gate: RwLock<()>,
    events: Arc<EventBus>,
}

impl Database {
    /// 按配置打开 SQLite 数据库
    pub async fn open(config: &StorageConfig, events: Arc<EventBus>) -> StoreResult<Self> {
        let repo = SqliteRepository::new(config).await?;
        Ok(Self::with_backend(Arc::new(repo), events))
    }

    /// 使用已有的存储后端
    pub fn with_backend(backend: Arc<dyn TrackerBackend>, events: Arc<EventBus>) -> Self {
        info!("存储后端已就绪: {}", backend.db_type());
        Self {
            backend,
            gate: RwLock::new(()),
            events,
        }
    }

    pub fn backend(&self) -> &dyn TrackerBackend {
        self.backend.as_ref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// 获取读端
    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    /// 获取写端
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// 确保分类存在，不存在时创建并发布事件；返回是否新建
    ///
    /// 调用方必须已经持有写端。
    pub(crate) async fn ensure_category_locked(
        &self,
        _guard: &RwLockWriteGuard<'_, ()>,
        title: &str,
    ) -> StoreResult<bool> {
        if self.backend.category_exists(title).await? {
            return Ok(false);
        }

        let created = self.backend.insert_category(title).await?;
        if created {
            debug!("新建分类: {}", title);
            self.events.publish(StoreEvent::CategoryCreated {
                title: title.to_string(),
            });
        }
        Ok(created)
    }
}
