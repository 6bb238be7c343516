// 完成记录存储 - 每个 (追踪器, 日历日) 至多一条记录

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error};
use uuid::Uuid;

use super::database::Database;
use super::error::StoreResult;
use crate::event_bus::StoreEvent;
use crate::models::CompletionRecord;

/// 完成记录存储
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 全部完成记录，按日期排序
    pub async fn fetch_all(&self) -> StoreResult<Vec<CompletionRecord>> {
        let _guard = self.db.read().await;
        self.db
            .backend()
            .fetch_records()
            .await
            .inspect_err(|e| error!("读取完成记录失败: {}", e))
    }

    /// 某个追踪器的完成记录，按日期排序
    pub async fn fetch_for_tracker(&self, tracker_id: Uuid) -> StoreResult<Vec<CompletionRecord>> {
        let _guard = self.db.read().await;
        self.db.backend().fetch_records_for_tracker(tracker_id).await
    }

    /// 在该日已完成的追踪器 ID
    pub async fn completed_on(&self, date: NaiveDate) -> StoreResult<HashSet<Uuid>> {
        let _guard = self.db.read().await;
        let records = self.db.backend().fetch_records_on(date).await?;
        Ok(records.into_iter().map(|r| r.tracker_id).collect())
    }

    /// 追踪器在该日是否已完成
    pub async fn is_completed(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let _guard = self.db.read().await;
        self.db.backend().record_exists(tracker_id, date).await
    }

    /// 追踪器的完成记录总数（不区分日期）
    pub async fn count_for_tracker(&self, tracker_id: Uuid) -> StoreResult<usize> {
        let _guard = self.db.read().await;
        let count = self
            .db
            .backend()
            .count_records_for_tracker(tracker_id)
            .await?;
        Ok(count.max(0) as usize)
    }

    /// 新增完成记录；该日已有记录时不做任何事。返回是否新增
    pub async fn add_completion(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let _guard = self.db.write().await;
        self.add_locked(tracker_id, date).await
    }

    /// 删除完成记录；该日没有记录时不做任何事。返回是否删除
    pub async fn remove_completion(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let _guard = self.db.write().await;
        self.remove_locked(tracker_id, date).await
    }

    /// 切换完成状态，检查与写入在同一次写锁内完成。返回切换后的状态
    pub async fn toggle_completion(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let _guard = self.db.write().await;

        let completed = self.db.backend().record_exists(tracker_id, date).await?;
        if completed {
            self.remove_locked(tracker_id, date).await?;
        } else {
            self.add_locked(tracker_id, date).await?;
        }
        Ok(!completed)
    }

    async fn add_locked(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let backend = self.db.backend();
        if backend.record_exists(tracker_id, date).await? {
            return Ok(false);
        }

        backend
            .insert_record(tracker_id, date)
            .await
            .inspect_err(|e| error!("新增完成记录失败 {} @ {}: {}", tracker_id, date, e))?;

        debug!("完成记录已新增: {} @ {}", tracker_id, date);
        self.db
            .events()
            .publish(StoreEvent::CompletionAdded { tracker_id, date });
        Ok(true)
    }

    async fn remove_locked(&self, tracker_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        let removed = self
            .db
            .backend()
            .delete_record(tracker_id, date)
            .await
            .inspect_err(|e| error!("删除完成记录失败 {} @ {}: {}", tracker_id, date, e))?;

        if removed == 0 {
            return Ok(false);
        }

        debug!("完成记录已删除: {} @ {}", tracker_id, date);
        self.db
            .events()
            .publish(StoreEvent::CompletionRemoved { tracker_id, date });
        Ok(true)
    }
}
