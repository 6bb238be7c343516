// 追踪器存储 - 追踪器表的查询、按 ID 覆盖写入与级联删除

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use super::database::Database;
use super::error::{StoreError, StoreResult};
use crate::event_bus::StoreEvent;
use crate::models::Tracker;

/// 追踪器存储
#[derive(Clone)]
pub struct TrackerStore {
    db: Arc<Database>,
}

impl TrackerStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 全部追踪器，按名称排序
    pub async fn fetch_all(&self) -> StoreResult<Vec<Tracker>> {
        let _guard = self.db.read().await;
        let trackers = self
            .db
            .backend()
            .fetch_trackers()
            .await
            .inspect_err(|e| error!("读取追踪器失败: {}", e))?;

        Ok(trackers.into_iter().map(|(tracker, _)| tracker).collect())
    }

    /// 按 ID 获取追踪器
    pub async fn get(&self, id: Uuid) -> StoreResult<Tracker> {
        self.find(id).await.map(|(tracker, _)| tracker)
    }

    /// 追踪器所属的分类标题
    pub async fn category_of(&self, id: Uuid) -> StoreResult<String> {
        self.find(id).await.map(|(_, category)| category)
    }

    async fn find(&self, id: Uuid) -> StoreResult<(Tracker, String)> {
        let _guard = self.db.read().await;
        self.db
            .backend()
            .find_tracker(id)
            .await?
            .ok_or_else(|| StoreError::not_found("tracker", id))
    }

    /// 保存追踪器：ID 不存在时插入，否则覆盖全部字段（包括所属分类）
    ///
    /// 分类按标题获取或创建。返回是否为新插入。
    pub async fn upsert(&self, tracker: &Tracker, category_title: &str) -> StoreResult<bool> {
        if tracker.name.trim().is_empty() {
            return Err(StoreError::InvalidEntity(format!(
                "tracker {} has an empty name",
                tracker.id
            )));
        }

        let guard = self.db.write().await;

        self.db
            .ensure_category_locked(&guard, category_title)
            .await
            .inspect_err(|e| error!("保存追踪器时创建分类失败: {}", e))?;

        let created = self
            .db
            .backend()
            .upsert_tracker(tracker, category_title)
            .await
            .inspect_err(|e| error!("保存追踪器 {} 失败: {}", tracker.id, e))?;

        info!(
            "{}追踪器: {} ({}) -> {}",
            if created { "新建" } else { "更新" },
            tracker.name,
            tracker.id,
            category_title
        );

        self.db.events().publish(StoreEvent::TrackerSaved {
            tracker_id: tracker.id,
            category_title: category_title.to_string(),
            created,
        });

        Ok(created)
    }

    /// 删除追踪器，同时删除其完成记录并解除分类关联；返回是否真的删除了
    pub async fn remove(&self, id: Uuid) -> StoreResult<bool> {
        let _guard = self.db.write().await;

        let removed = self
            .db
            .backend()
            .delete_tracker(id)
            .await
            .inspect_err(|e| error!("删除追踪器 {} 失败: {}", id, e))?;

        if removed {
            info!("删除追踪器: {}", id);
            self.db
                .events()
                .publish(StoreEvent::TrackerRemoved { tracker_id: id });
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use crate::models::{TaskType, Weekday};
    use crate::storage::category_store::CategoryStore;
    use crate::storage::config::StorageConfig;
    use crate::storage::record_store::RecordStore;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    struct Fixture {
        trackers: TrackerStore,
        categories: CategoryStore,
        records: RecordStore,
        events: Arc<EventBus>,
    }

    async fn fixture(dir: &tempfile::TempDir) -> Fixture {
        let events = Arc::new(EventBus::new(64));
        let config = StorageConfig::sqlite(dir.path().join("tracker.db").to_string_lossy());
        let db = Arc::new(Database::open(&config, events.clone()).await.unwrap());
        Fixture {
            trackers: TrackerStore::new(db.clone()),
            categories: CategoryStore::new(db.clone()),
            records: RecordStore::new(db),
            events,
        }
    }

    fn tracker(name: &str) -> Tracker {
        Tracker {
            id: Uuid::new_v4(),
            name: name.to_string(),
            task_type: TaskType::Habit,
            color: "#FF881E".to_string(),
            emoji: "🍔".to_string(),
            schedule: Weekday::ALL.into_iter().collect(),
            created_on: NaiveDate::from_ymd_opt(2024, 11, 10).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_category_and_sorts_by_name() {
        let temp_dir = tempdir().unwrap();
        let f = fixture(&temp_dir).await;

        assert!(f.trackers.upsert(&tracker("Йога"), "Спорт").await.unwrap());
        assert!(f.trackers.upsert(&tracker("Бег"), "Спорт").await.unwrap());

        let names: Vec<_> = f
            .trackers
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Бег", "Йога"]);

        let category = f.categories.get("Спорт").await.unwrap();
        assert_eq!(category.tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_moves_category() {
        let temp_dir = tempdir().unwrap();
        let f = fixture(&temp_dir).await;
        let mut receiver = f.events.subscribe();

        let mut t = tracker("Читать");
        f.trackers.upsert(&t, "Дом").await.unwrap();

        t.name = "Читать книгу".to_string();
        t.schedule = [Weekday::Sunday].into_iter().collect();
        assert!(!f.trackers.upsert(&t, "Учёба").await.unwrap());

        assert_eq!(f.trackers.get(t.id).await.unwrap(), t);
        assert_eq!(f.trackers.category_of(t.id).await.unwrap(), "Учёба");
        assert!(f.categories.get("Дом").await.unwrap().tasks.is_empty());

        let mut saved = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let StoreEvent::TrackerSaved { created, .. } = event {
                saved.push(created);
            }
        }
        assert_eq!(saved, vec![true, false]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_name() {
        let temp_dir = tempdir().unwrap();
        let f = fixture(&temp_dir).await;

        let err = f.trackers.upsert(&tracker("  "), "Дом").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidEntity(_)));
        assert_eq!(f.categories.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_cascades_completion_records() {
        let temp_dir = tempdir().unwrap();
        let f = fixture(&temp_dir).await;

        let t = tracker("Вода");
        let other = tracker("Сон");
        f.trackers.upsert(&t, "Здоровье").await.unwrap();
        f.trackers.upsert(&other, "Здоровье").await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 11, 11).unwrap();
        f.records.add_completion(t.id, day).await.unwrap();
        f.records.add_completion(other.id, day).await.unwrap();

        assert!(f.trackers.remove(t.id).await.unwrap());
        assert!(!f.trackers.remove(t.id).await.unwrap());

        assert!(f.trackers.get(t.id).await.unwrap_err().is_not_found());
        let remaining = f.records.fetch_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].tracker_id, other.id);

        let category = f.categories.get("Здоровье").await.unwrap();
        assert_eq!(category.tasks, vec![other]);
    }
}
